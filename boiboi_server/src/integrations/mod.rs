pub mod paystack;
pub mod push;
