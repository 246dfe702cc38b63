pub mod games;              // catalog listing, hot list, single game
pub mod payment_methods;    // static list from the seed file
pub mod auth_telegram;      // login widget: JSON post + redirect callback
pub mod auth_google;        // OAuth2 redirect + callback
pub mod session;            // bearer token -> signed-in user
pub mod telegram_image;     // avatar proxy
pub mod validate_user;      // relay to the sync-user service
pub mod orders;             // stateless order draft
