pub mod articles;
pub mod facts;
pub mod lifecycle;
pub mod model;
pub mod schema;
pub mod urgency;

pub use articles::{ArticleRef, is_scoped, parse_articles};
pub use facts::{AmendmentFact, FeedBatch, LawLink, OrdinanceFact, ParentLawFact};
pub use lifecycle::TransitionError;
pub use model::{
    Amendment, AmendmentFilter, AmendmentId, Category, ChangeType, LawType, Ordinance,
    OrdinanceId, ParentLaw, ParentLawId, ParseError, Review, ReviewFilter, ReviewId, ReviewStatus,
    ReviewUpdate, Urgency,
};
pub use schema::report;
pub use urgency::{Classification, ClassificationInput, Rule, classify};
