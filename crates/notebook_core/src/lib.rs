pub mod auth;
pub mod content;
pub mod domain;
pub mod error;
pub mod ports;
pub mod resolver;
pub mod revisions;
pub mod sanitize;
pub mod token;

#[cfg(any(test, feature = "testing"))]
pub mod memory;

pub use auth::{AuthService, SignedIn};
pub use content::ContentService;
pub use domain::{
    Book, BookUpdate, ContentChange, Identity, NewPage, NewUser, Page, PageChanges, PageRevision,
    PageUpdate, ProfileFields, ProfileUpdate, User, UserCredentials,
};
pub use error::{ServiceError, ServiceResult};
pub use ports::{NotebookStore, PortError, PortResult};
pub use resolver::{OwnershipResolver, Resolved};
pub use revisions::{RevisionStore, MAX_REVISIONS_PER_PAGE};
pub use sanitize::{word_count, HtmlSanitizer};
pub use token::{TokenCodec, TokenError, TOKEN_TTL_SECS};
