//! SSO login, OAuth token exchange, and session persistence.
//!
//! A login drives the portal in [`sso`], redeems the resulting ticket for an
//! OAuth1 pair, and trades that pair for an OAuth2 bearer token in
//! [`exchange`]. Every outbound request in the exchange is signed by
//! [`oauth1`].

mod consumer;
mod error;
pub mod exchange;
pub(crate) mod http;
pub mod oauth1;
mod provider;
mod scrape;
pub mod sso;
mod store;
mod types;

pub use consumer::{fetch_consumer, DEFAULT_CONSUMER_URL};
pub use error::{AuthError, LoginStage};
pub use exchange::{exchange_oauth2, redeem_ticket};
pub use oauth1::ConsumerCredentials;
pub use provider::{Domain, Endpoints};
pub use scrape::{csrf_token, page_title, ticket};
pub use sso::{BoxError, MfaHandler, SsoFlow};
pub use store::{
    default_session_path, load_session_file, read_session, remove_session_file,
    save_session_file, write_session,
};
pub use types::{OAuth1Token, OAuth2Token, Session, SsoTicket};
