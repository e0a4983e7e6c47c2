use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::broker::{topics, BrokerClient, BrokerError, Envelope, Subscription};
use crate::domain::activity::{ActivityId, ActivityType, UserId};
use crate::domain::product::ProductId;
use crate::errors::{ApplicationError, DomainError};
use crate::events::{PreferencesUpdatedEvent, UserActivityEvent, UserCreatedEvent};
use crate::lifecycle::RecommendationService;

/// Topics the service listens on.
pub const CONSUMED_TOPICS: [&str; 3] =
    [topics::USER_ACTIVITY, topics::USER_PREFERENCES_UPDATED, topics::USER_CREATED];

/// Applies inbound broker events to the recommendation service.
#[derive(Clone)]
pub struct EventConsumer {
    service: Arc<RecommendationService>,
}

impl EventConsumer {
    pub fn new(service: Arc<RecommendationService>) -> Self {
        Self { service }
    }

    pub async fn handle(&self, envelope: &Envelope) -> Result<(), ApplicationError> {
        match envelope.topic.as_str() {
            topics::USER_ACTIVITY => self.on_activity(decode(envelope)?).await,
            topics::USER_PREFERENCES_UPDATED => self.on_preferences_updated(decode(envelope)?).await,
            topics::USER_CREATED => {
                let event: UserCreatedEvent = decode(envelope)?;
                info!(event_name = "user.created", user_id = %event.user_id, "user created event received");
                Ok(())
            }
            other => {
                debug!(event_name = "consumer.ignored", topic = other, "ignoring unknown topic");
                Ok(())
            }
        }
    }

    async fn on_activity(&self, event: UserActivityEvent) -> Result<(), ApplicationError> {
        let activity_type: ActivityType = event.activity_type.parse()?;
        let id = event.event_id.map(ActivityId).unwrap_or_else(ActivityId::generate);
        self.service
            .record_activity(
                id,
                &UserId(event.user_id),
                &ProductId(event.product_id),
                activity_type,
                Some(event.metadata),
            )
            .await?;
        Ok(())
    }

    async fn on_preferences_updated(
        &self,
        event: PreferencesUpdatedEvent,
    ) -> Result<(), ApplicationError> {
        let user_id = UserId(event.user_id);
        let set =
            self.service.generate_user_recommendations(&user_id, Some(&event.preferences)).await?;
        info!(
            event_name = "preferences.applied",
            user_id = %user_id,
            recommendation_id = %set.id,
            "recommendations refreshed after preference update"
        );
        Ok(())
    }

    /// Run until the subscription ends or `cancel` fires. Handler failures are
    /// logged and the loop moves on to the next envelope.
    pub async fn consume(&self, mut subscription: Subscription, cancel: CancellationToken) {
        loop {
            let envelope = tokio::select! {
                _ = cancel.cancelled() => break,
                next = subscription.next() => match next {
                    Some(envelope) => envelope,
                    None => break,
                },
            };

            if let Err(error) = self.handle(&envelope).await {
                warn!(
                    event_name = "consumer.handler_failed",
                    topic = %envelope.topic,
                    error_class = error.class(),
                    error = %error,
                    "event handling failed"
                );
            }
        }
        debug!(event_name = "consumer.stopped", topic = subscription.topic(), "consumer stopped");
    }
}

/// Subscribe to every consumed topic and run one consumer task per topic.
pub fn spawn_consumers(
    broker: &BrokerClient,
    consumer: EventConsumer,
    cancel: &CancellationToken,
) -> Result<JoinSet<()>, BrokerError> {
    let mut tasks = JoinSet::new();
    for topic in CONSUMED_TOPICS {
        let subscription = broker.subscribe(topic)?;
        let consumer = consumer.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move { consumer.consume(subscription, cancel).await });
        info!(event_name = "consumer.started", topic, "consuming topic");
    }
    Ok(tasks)
}

fn decode<T: DeserializeOwned>(envelope: &Envelope) -> Result<T, ApplicationError> {
    serde_json::from_value(envelope.payload.clone()).map_err(|error| {
        DomainError::MalformedPayload(format!("{}: {error}", envelope.topic)).into()
    })
}
