//! Application services and ports.

#![forbid(unsafe_code)]

mod cancellation;
mod discepto;
mod discepto_handle;
mod essay_handle;
mod essay_ports;
mod notification_ports;
mod permission_resolver;
mod role_ports;
mod roles_service;
mod subdiscepto_handle;
mod subdiscepto_ports;
mod user_handle;
mod user_ports;

pub use cancellation::{Cancellation, CancellationTrigger};
pub use discepto::{Discepto, DisceptoPorts};
pub use discepto_handle::DisceptoHandle;
pub use essay_handle::{EssayCapabilities, EssayHandle};
pub use essay_ports::{EssayRepository, NewEssay, NewReport};
pub use notification_ports::NotificationService;
pub use permission_resolver::PermissionResolver;
pub use role_ports::{NewRole, PresetRoleSeed, RoleRepository};
pub use roles_service::RolesService;
pub use subdiscepto_handle::{SubdisceptoHandle, SubdisceptoView};
pub use subdiscepto_ports::SubdisceptoRepository;
pub use user_handle::{UserCapabilities, UserHandle};
pub use user_ports::{NewUser, PasswordHasher, RegistrationGrants, UserRepository};
