//! Shared Module
//!
//! This module contains types and data structures that are shared between
//! the realtime server and its clients. Everything here is transport-neutral
//! and serializable so it can travel inside socket frames or REST bodies.
//!
//! # Overview
//!
//! - **`model`** - Domain records owned by the data store (boards, tasks,
//!   notifications, memberships) plus the actor profile attached to
//!   broadcasts
//! - **`event`** - Inbound client frames and outbound server events
//! - **`error`** - Validation and serialization errors
//! - **`config`** - Realtime tuning knobs and their builder

/// Domain records
pub mod model;

/// Socket frame and event envelope types
pub mod event;

/// Shared error types
pub mod error;

/// Realtime configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use model::{
    ActorProfile, Board, ChatMessage, Column, Comment, DeliveryReceipt, MembershipRecord,
    NotificationDisposition, NotificationDraft, NotificationRecord, Task, UserProfile, Workspace,
    WorkspaceLimits, WorkspaceUsage,
};
pub use event::{ClientFrame, ErrorPayload, ServerEvent};
pub use error::SharedError;
pub use config::{ConfigError, RealtimeConfig, RealtimeConfigBuilder};
