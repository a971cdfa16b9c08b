use crate::conversations::ConversationRepository;
use crate::help_requests::HelpRequestRepository;
use crate::messages::MessageRepository;
use crate::profiles::ProfileRepository;
use crate::MutualAidError;

pub trait Store {
    type Conversations<'a>: ConversationRepository
    where
        Self: 'a;
    type HelpRequests<'a>: HelpRequestRepository
    where
        Self: 'a;
    type Profiles<'a>: ProfileRepository
    where
        Self: 'a;
    type Messages<'a>: MessageRepository
    where
        Self: 'a;

    fn conversations(&self) -> Self::Conversations<'_>;
    fn help_requests(&self) -> Self::HelpRequests<'_>;
    fn profiles(&self) -> Self::Profiles<'_>;
    fn messages(&self) -> Self::Messages<'_>;

    fn with_tx<F, T>(&self, f: F) -> Result<T, MutualAidError>
    where
        F: FnOnce(&Self) -> Result<T, MutualAidError>;
}
