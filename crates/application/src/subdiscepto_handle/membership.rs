use tracing::info;

use discepto_core::AppResult;
use discepto_domain::{MembershipChange, Permission};

use crate::UserHandle;

use super::SubdisceptoHandle;

impl SubdisceptoHandle {
    /// Joins the community on behalf of `user`. A former member is
    /// readmitted through the rejoin path.
    pub async fn add_member(&self, user: &UserHandle) -> AppResult<MembershipChange> {
        self.cancellation
            .run(async {
                self.permissions.require(&[Permission::ReadSubdiscepto])?;
                user.require_acting()?;

                let change = self
                    .ports
                    .subdisceptos
                    .join_subdiscepto(&self.subdiscepto, user.id())
                    .await?;
                info!(
                    subdiscepto = %self.subdiscepto.name,
                    user_id = %user.id(),
                    ?change,
                    "member added"
                );
                Ok(change)
            })
            .await
    }

    /// Leaves the community on behalf of `user`. Every community role is
    /// dropped; members in good standing keep the rejoin marker.
    pub async fn remove_member(&self, user: &UserHandle) -> AppResult<()> {
        self.cancellation
            .run(async {
                self.permissions.require(&[Permission::ReadSubdiscepto])?;
                user.require_acting()?;

                let keep_rejoin_marker = self.permissions.has(Permission::CommonAfterRejoin);
                self.ports
                    .subdisceptos
                    .leave_subdiscepto(&self.subdiscepto, user.id(), keep_rejoin_marker)
                    .await?;
                info!(
                    subdiscepto = %self.subdiscepto.name,
                    user_id = %user.id(),
                    keep_rejoin_marker,
                    "member removed"
                );
                Ok(())
            })
            .await
    }
}
