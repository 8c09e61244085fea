use tracing::info;

use discepto_core::AppResult;
use discepto_domain::{FlagType, Permission, Report, ReportId};

use crate::{EssayHandle, NewReport, UserHandle};

use super::SubdisceptoHandle;

impl SubdisceptoHandle {
    /// Files a report against an essay of this community.
    pub async fn create_report(
        &self,
        essay: &EssayHandle,
        reporter: &UserHandle,
        flag: FlagType,
        description: &str,
    ) -> AppResult<Report> {
        self.cancellation
            .run(async {
                self.permissions.require(&[Permission::CreateReport])?;
                reporter.require_acting()?;
                self.require_local(essay)?;
                essay.require_read()?;

                let report = self
                    .ports
                    .essays
                    .create_report(NewReport {
                        flag,
                        description: description.trim().to_owned(),
                        essay_id: essay.id(),
                        from_user_id: reporter.id(),
                    })
                    .await?;
                info!(subdiscepto = %self.subdiscepto.name, essay_id = %essay.id(), "report filed");
                Ok(report)
            })
            .await
    }

    /// Lists reports filed in this community.
    pub async fn list_reports(&self) -> AppResult<Vec<Report>> {
        self.cancellation
            .run(async {
                self.permissions.require(&[Permission::ViewReport])?;
                self.ports.essays.list_reports(&self.subdiscepto.name).await
            })
            .await
    }

    /// Deletes a report filed in this community.
    pub async fn delete_report(&self, report_id: ReportId) -> AppResult<()> {
        self.cancellation
            .run(async {
                self.permissions.require(&[Permission::DeleteReport])?;
                self.ports
                    .essays
                    .delete_report(&self.subdiscepto.name, report_id)
                    .await
            })
            .await
    }
}
