pub mod batch;
pub mod broker;
pub mod cache;
pub mod clock;
pub mod config;
pub mod consumers;
pub mod domain;
pub mod errors;
pub mod events;
pub mod lifecycle;
pub mod locks;
pub mod ports;
pub mod recommend;

pub use batch::{BatchOrchestrator, BatchOutcome, BatchSettings};
pub use broker::{topics, BrokerClient, BrokerError, Envelope, EventPublisher, Subscription};
pub use cache::{CachedCatalog, ReadThroughCache};
pub use clock::{Clock, FixedClock, SystemClock};
pub use consumers::{spawn_consumers, EventConsumer};
pub use domain::activity::{
    ActivityId, ActivityMetadata, ActivityRecord, ActivityType, ResolvedActivity, UserId,
};
pub use domain::product::{Product, ProductId};
pub use domain::recommendation::{
    RecommendationId, RecommendationReason, RecommendationSet, RecommendationView,
    RecommendedProduct, ScoredProduct,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use lifecycle::{RecommendationService, RecordedActivity, ServiceDependencies};
pub use ports::{ActivityStore, Catalog, ProductQuery, RecommendationStore, RepositoryError};
pub use recommend::{
    CandidateSelection, CandidateSelector, RecommendationEngine, ScoreCalculator, UserPreferences,
};
