//! Identity and conversation-directory core of the nexus chat server.
//!
//! A real-time transport only needs two entry points from this crate:
//! [`auth::Authenticator::resolve`] to turn a presented credential into an
//! [`auth::Identity`], and [`db::ConversationRepository::get_by_id`] /
//! [`db::ConversationRepository::list_members`] to look up a conversation.

pub mod api;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;

#[cfg(test)]
pub(crate) mod test_helpers;
