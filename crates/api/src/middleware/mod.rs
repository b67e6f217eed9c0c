//! HTTP middleware components.

pub mod logging;
pub mod metrics;
pub mod rbac;
pub mod trace_id;
pub mod user_auth;

pub use metrics::{init_metrics, metrics_handler, metrics_middleware};
pub use rbac::{require_group_member, require_group_moderator, require_group_owner, GroupAccess};
pub use trace_id::{trace_id, RequestId, REQUEST_ID_HEADER};
pub use user_auth::{require_user_auth, UserAuth};
