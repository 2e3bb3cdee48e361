use log::*;
use tempfile::TempDir;

use boiboi_engine::{
    db_types::{AccountStatus, CheckoutSettings, DeliveryService, Kobo, NewUser, Store, User, UserRole, IN_HOUSE_FLEET_CODE},
    AccountManagement,
    MarketplaceDatabase,
    SqliteDatabase,
};

/// A migrated database in a temporary directory. The directory is removed when this value is dropped.
pub struct TestEnv {
    pub db: SqliteDatabase,
    _dir: TempDir,
}

pub async fn prepare_test_env() -> TestEnv {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let dir = tempfile::tempdir().expect("Could not create a temporary directory");
    let url = format!("sqlite://{}", dir.path().join("boiboi_test.db").display());
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating test database");
    debug!("🚀️ Test database ready at {url}");
    TestEnv { db, _dir: dir }
}

/// A small marketplace: one active store with its merchant admin, a customer with ₦20,000 in their wallet, an in-house
/// rider, and a rider from an outside fleet whose admin receives delivery fees. Checkout settings are 90/10.
pub struct Marketplace {
    pub store: Store,
    pub merchant: User,
    pub customer: User,
    pub in_house_rider: User,
    pub fleet_rider: User,
    pub fleet_admin: User,
    pub in_house_fleet: DeliveryService,
    pub fleet: DeliveryService,
}

impl TestEnv {
    pub async fn seed_marketplace(&self) -> Marketplace {
        let db = &self.db;
        let store = db.insert_store("Mama Put Kitchen", AccountStatus::Active).await.expect("store");
        let merchant = db
            .insert_user(NewUser::new(UserRole::Merchant, "Chidi", "chidi@mamaput.ng").with_store(store.id.clone()).as_admin())
            .await
            .expect("merchant");
        let customer = db
            .insert_user(NewUser::new(UserRole::Customer, "Ada", "ada@example.com").with_balance(Kobo::from_naira(20_000)))
            .await
            .expect("customer");
        let in_house_fleet = db.insert_delivery_service("Boiboi Riders", IN_HOUSE_FLEET_CODE, None).await.expect("fleet");
        let in_house_rider = db
            .insert_user(
                NewUser::new(UserRole::Rider, "Tunde", "tunde@boiboi.ng").with_delivery_service(in_house_fleet.id.clone()),
            )
            .await
            .expect("in-house rider");
        let fleet = db.insert_delivery_service("Swift Dispatch", "SWIFT1", None).await.expect("fleet");
        let fleet_admin = db
            .insert_user(NewUser::new(UserRole::Rider, "Bola", "bola@swift.ng").with_delivery_service(fleet.id.clone()))
            .await
            .expect("fleet admin");
        db.set_delivery_service_admin(&fleet.id, &fleet_admin.id).await.expect("fleet admin");
        let fleet_rider = db
            .insert_user(NewUser::new(UserRole::Rider, "Emeka", "emeka@swift.ng").with_delivery_service(fleet.id.clone()))
            .await
            .expect("fleet rider");
        let fleet = db.fetch_delivery_service(&fleet.id).await.expect("fleet").expect("fleet exists");
        db.update_checkout_settings(CheckoutSettings { store_percent_bps: 9_000, platform_percent_bps: 1_000 })
            .await
            .expect("settings");
        Marketplace { store, merchant, customer, in_house_rider, fleet_rider, fleet_admin, in_house_fleet, fleet }
    }

    /// Re-reads a user, e.g. to check their balance.
    pub async fn user(&self, user: &User) -> User {
        self.db.fetch_user(&user.id).await.expect("fetch user").expect("user exists")
    }
}
