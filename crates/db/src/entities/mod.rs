//! Database entities.

pub mod direct_message;
pub mod friend;
pub mod game;
pub mod game_chat_message;
pub mod game_invite;
pub mod game_player;
pub mod user;

pub use direct_message::Entity as DirectMessage;
pub use friend::Entity as Friend;
pub use game::Entity as Game;
pub use game_chat_message::Entity as GameChatMessage;
pub use game_invite::Entity as GameInvite;
pub use game_player::Entity as GamePlayer;
pub use user::Entity as User;
