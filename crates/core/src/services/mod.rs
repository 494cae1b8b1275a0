//! Business logic services.

#![allow(missing_docs)]

pub mod friend;
pub mod game;
pub mod messaging;
pub mod user;

pub use friend::{
    FriendDecision, FriendRequestResponse, FriendResponse, FriendService,
    IncomingRequestResponse, SendFriendRequestInput,
};
pub use game::{
    ChatMessageResponse, CreateGameInput, EditGameInput, GameResponse, GameService,
    PlayerResponse, PostChatInput, Sport,
};
pub use messaging::{ChatSummaryResponse, MessageResponse, MessagingService, SendMessageInput};
pub use user::{
    ProfileResponse, RegisterInput, SessionResponse, SigninInput, UpdateFavoritesInput,
    UpdateNameInput, UserResponse, UserService,
};
