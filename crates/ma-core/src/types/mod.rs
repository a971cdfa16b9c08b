pub mod conversation;
pub mod enums;
pub mod help_request;
pub mod ids;
pub mod io;
pub mod message;
pub mod profile;

pub use conversation::Conversation;
pub use enums::{ConversationStatus, HelpRequestStatus, Party};
pub use help_request::HelpRequest;
pub use ids::{ConversationId, HelpRequestId, IdError, MessageId, NotificationId, UserId};
pub use io::{
    Confirmation, CreateHelpRequestInput, CreateProfileInput, NewConversation, NewHelpRequest,
    NewMessage,
};
pub use message::Message;
pub use profile::Profile;
