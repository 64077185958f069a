use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{ContributionChargedEvent, EventHandler, EventProducer, Handler, WalletCreditedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub wallet_credited_producer: Vec<EventProducer<WalletCreditedEvent>>,
    pub contribution_charged_producer: Vec<EventProducer<ContributionChargedEvent>>,
}

pub struct EventHandlers {
    pub on_wallet_credited: Option<EventHandler<WalletCreditedEvent>>,
    pub on_contribution_charged: Option<EventHandler<ContributionChargedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_wallet_credited = hooks.on_wallet_credited.map(|f| EventHandler::new(buffer_size, f));
        let on_contribution_charged = hooks.on_contribution_charged.map(|f| EventHandler::new(buffer_size, f));
        Self { on_wallet_credited, on_contribution_charged }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_wallet_credited {
            result.wallet_credited_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_contribution_charged {
            result.contribution_charged_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_wallet_credited {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_contribution_charged {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_wallet_credited: Option<Handler<WalletCreditedEvent>>,
    pub on_contribution_charged: Option<Handler<ContributionChargedEvent>>,
}

impl EventHooks {
    pub fn on_wallet_credited<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(WalletCreditedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_wallet_credited = Some(Arc::new(f));
        self
    }

    pub fn on_contribution_charged<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ContributionChargedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_contribution_charged = Some(Arc::new(f));
        self
    }
}
