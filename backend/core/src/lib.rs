//! # DbD Info Core
//!
//! Decision logic behind the extension backend. Nothing in here talks to Twitch or Redis.
//!
//! ## Flow of a build mutation
//!
//! 1. The actor is resolved from a verified token (role, optional user id, channel id)
//! 2. [`permissions::may_mutate_build`] decides against the broadcaster's sharing config
//! 3. [`build::validate_strict`] checks the raw payload against the loaded [`catalog::Catalog`]
//! 4. Only a [`build::ValidBuild`] may be persisted and broadcast
//!
//! [`mutation::authorize_and_validate`] runs the two gates in that order.
//!
//! ## Advisory check
//!
//! [`advisory::check_advisory`] is the softer client side variant. It never looks at the catalog,
//! it only warns about empty slots and refuses to republish the live build.
//!
//! ## Catalog
//!
//! The catalog is fetched once at startup from an ordered list of [`sources::Source`]s and then
//! never changes. Until it is installed every lookup goes through [`catalog::CatalogState::Uninitialized`]
//! and fails with a not ready error instead of a validation error.

pub mod advisory;
pub mod build;
pub mod catalog;
pub mod error;
pub mod mutation;
pub mod permissions;
pub mod sources;
