//! Real-time Module
//!
//! Connection bookkeeping and event routing shared by all namespaces.
//!
//! # Architecture
//!
//! - **`connection`** - `Namespace`, `SocketId` and the per-connection
//!   `ConnectionContext`
//! - **`room`** - Namespaced room keys
//! - **`registry`** - `MembershipRegistry`, the room ↔ socket ↔ identity index
//! - **`broadcast`** - `BroadcastRouter`: room/identity emits and the
//!   notification pipeline
//! - **`locks`** - `KeyedLocks`, per-key async mutexes
//! - **`fanout`** - `ClusterFanout` seam for multi-instance deployments
//!
//! # Lifecycle
//!
//! ```text
//! connect → register_socket (personal room) → join/leave resource rooms
//!         → on_disconnect (all rooms released, "left" notices emitted)
//! ```
//!
//! Every socket owns an unbounded outbound channel. The registry stores the
//! sender; the transport task drains the receiver into the WebSocket.

/// Connection context and namespaces
pub mod connection;

/// Room keys
pub mod room;

/// Membership index
pub mod registry;

/// Event routing and notification fanout
pub mod broadcast;

/// Per-key async locks
pub mod locks;

/// Cross-instance fanout seam
pub mod fanout;

pub use broadcast::{
    BroadcastRouter, BulkNotification, BulkOutcome, NOTIFICATION_DELETED_EVENT,
    NOTIFICATION_EVENT, UNREAD_COUNT_EVENT,
};
pub use connection::{ConnectionContext, Namespace, SocketId};
pub use fanout::{ClusterFanout, FanoutTarget, LocalOnly};
pub use locks::KeyedLocks;
pub use registry::{DisconnectOutcome, JoinOutcome, LeaveOutcome, MembershipRegistry, RegistryStats, SocketSender};
pub use room::Room;
