// the widget posts exactly the payload the verifier checks
pub use crate::auth::TelegramPayload as TelegramLoginReq;
