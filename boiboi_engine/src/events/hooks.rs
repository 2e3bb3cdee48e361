use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    OrderCancelledEvent,
    OrderCompletedEvent,
    OrderPlacedEvent,
    ProgressUpdatedEvent,
    WalletCreditedEvent,
    WithdrawalProcessedEvent,
};

/// Declares the hook registry ([`EventHooks`]), the running handlers ([`EventHandlers`]) and the producer set
/// ([`EventProducers`]) the engine APIs publish through, with one slot per event type.
macro_rules! event_hooks {
    ($($hook:ident, $producer:ident: $event:ty;)+) => {
        #[derive(Default, Clone)]
        pub struct EventProducers {
            $(pub $producer: Vec<EventProducer<$event>>,)+
        }

        pub struct EventHandlers {
            $(pub $hook: Option<EventHandler<$event>>,)+
        }

        impl EventHandlers {
            pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
                Self { $($hook: hooks.$hook.map(|f| EventHandler::new(buffer_size, f)),)+ }
            }

            pub fn producers(&self) -> EventProducers {
                let mut result = EventProducers::default();
                $(
                    if let Some(handler) = &self.$hook {
                        result.$producer.push(handler.subscribe());
                    }
                )+
                result
            }

            /// Spawns a task for every registered handler. Each task ends once all of its producers have been dropped.
            pub async fn start_handlers(self) {
                $(
                    if let Some(handler) = self.$hook {
                        tokio::spawn(async move {
                            handler.start_handler().await;
                        });
                    }
                )+
            }
        }

        #[derive(Default, Clone)]
        pub struct EventHooks {
            $(pub $hook: Option<Handler<$event>>,)+
        }

        impl EventHooks {
            $(
                pub fn $hook<F>(&mut self, f: F) -> &mut Self
                where F: (Fn($event) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
                    self.$hook = Some(Arc::new(f));
                    self
                }
            )+
        }
    };
}

event_hooks! {
    on_order_placed, order_placed_producer: OrderPlacedEvent;
    on_progress_updated, progress_updated_producer: ProgressUpdatedEvent;
    on_order_completed, order_completed_producer: OrderCompletedEvent;
    on_order_cancelled, order_cancelled_producer: OrderCancelledEvent;
    on_wallet_credited, wallet_credited_producer: WalletCreditedEvent;
    on_withdrawal_processed, withdrawal_processed_producer: WithdrawalProcessedEvent;
}

impl EventProducers {
    pub async fn order_placed(&self, event: OrderPlacedEvent) {
        for producer in &self.order_placed_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn progress_updated(&self, event: ProgressUpdatedEvent) {
        for producer in &self.progress_updated_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn order_completed(&self, event: OrderCompletedEvent) {
        for producer in &self.order_completed_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn order_cancelled(&self, event: OrderCancelledEvent) {
        for producer in &self.order_cancelled_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn wallet_credited(&self, event: WalletCreditedEvent) {
        for producer in &self.wallet_credited_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn withdrawal_processed(&self, event: WithdrawalProcessedEvent) {
        for producer in &self.withdrawal_processed_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}
