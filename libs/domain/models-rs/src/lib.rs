// [libs/domain/models-rs/src/lib.rs]

pub mod allocation;
pub mod earning;
pub mod errors;
pub mod money;
pub mod payout;
pub mod route;
pub mod task;
pub mod worker;

pub use allocation::{Allocation, AllocationStatus, ExpiryReason};
pub use earning::{Earning, EarningType};
pub use errors::DomainError;
pub use money::{present_amount, require_non_negative, MONETARY_SCALE};
pub use payout::{Payout, PayoutMethod, PayoutStatus};
pub use route::{Route, RouteStatus, RouteStop, RouteStopStatus};
pub use task::{
    ProofType, SitePoint, Task, TaskDraft, TaskProof, TaskStatus, TaskType,
};
pub use worker::{
    Availability, VehicleKind, VehicleProfile, Worker, WorkerLifecycle, WorkerType,
};
