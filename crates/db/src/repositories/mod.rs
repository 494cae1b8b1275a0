//! Database repositories.

mod friend;
mod game;
mod messaging;
mod user;

pub use friend::FriendRepository;
pub use game::{GameRepository, JoinOutcome};
pub use messaging::MessagingRepository;
pub use user::UserRepository;
