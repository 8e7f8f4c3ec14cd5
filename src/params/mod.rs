//! This module holds typed parameters for endpoint inputs.
//!
//! By using typed parameters we ensure that inputs are validated (by type)
//! and correctly formatted before they are handed to the SSE core.

pub(crate) mod event;
