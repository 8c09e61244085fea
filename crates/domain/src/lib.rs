//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod essay;
mod notification;
mod permission;
mod role;
mod subdiscepto;
mod user;

pub use essay::{
    Essay, EssayDraft, EssayId, EssaySearch, FlagType, LIMIT_MAX_CONTENT_LEN, LIMIT_MAX_TAGS,
    ReplyLink, ReplyType, Report, ReportId, ValidatedEssay, VoteType,
};
pub use notification::{Notification, NotificationId, NotificationKind, NotificationView};
pub use permission::{Permission, PermissionSet};
pub use role::{
    PresetRole, Role, RoleDomainId, RoleDomainKind, RoleId, RoleName, global_admin_permissions,
    inherited_permissions, subdiscepto_owner_permissions,
};
pub use subdiscepto::{
    Member, Membership, MembershipChange, NewSubdiscepto, Subdiscepto, SubdisceptoName,
    SubdisceptoSettings, SubdisceptoSummary,
};
pub use user::{
    EMAIL_MAX_LENGTH, EmailAddress, PASSWORD_MAX_LENGTH, PASSWORD_MIN_LENGTH, PublicUser,
    Registration, User, UserId, validate_password,
};
