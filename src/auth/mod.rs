mod credentials;
mod receiver;
mod store;
mod token;

pub use credentials::{ClientConfig, load_config};
pub use receiver::{CodeReceiver, ConsoleReceiver, LoopbackReceiver};
pub use store::{TokenSource, TokenStore};
pub use token::{Token, clear_tokens};

#[cfg(test)]
pub(crate) use credentials::test_helpers::write_client_secret;
#[cfg(test)]
pub(crate) use receiver::mocks::MockReceiver;
#[cfg(test)]
pub(crate) use token::test_helpers::mock_token;
