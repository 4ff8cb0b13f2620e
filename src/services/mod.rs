pub mod comments;
pub mod engagement;
pub mod feed_signal;
pub mod identity;
pub mod notifications;
pub mod posts;
pub mod users;

pub use comments::CommentService;
pub use engagement::EngagementService;
pub use feed_signal::FeedSignal;
pub use identity::IdentityResolver;
pub use notifications::NotificationService;
pub use posts::PostService;
pub use users::UserService;
