//! Data models exchanged with the backend.

mod profile;
mod session;
mod user;

pub use profile::{
    LearningInput, NotificationInput, PersonalInput, PreferenceInput, ProfileInput, UserProfile,
    DEFAULT_DAILY_GOAL_MINUTES, DEFAULT_EXPERIENCE_LEVEL, DEFAULT_LANGUAGE, DEFAULT_TIMEZONE,
};
pub use session::{
    EmailVerification, OAuthProvider, OAuthRedirect, ResendKind, Session, SignUpOptions,
    SignUpResponse, UserAttributes,
};
pub use user::User;
