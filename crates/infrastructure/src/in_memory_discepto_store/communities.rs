use chrono::Utc;

use discepto_application::SubdisceptoRepository;
use discepto_domain::{
    Member, MembershipChange, NewSubdiscepto, SubdisceptoSettings, SubdisceptoSummary,
};

use super::*;

impl StoreState {
    fn subdiscepto(&self, name: &SubdisceptoName) -> AppResult<&Subdiscepto> {
        self.subdisceptos
            .get(name)
            .ok_or_else(|| AppError::NotFound(format!("subdiscepto '{name}'")))
    }

    fn is_active_member(&self, name: &SubdisceptoName, user_id: UserId) -> bool {
        self.memberships
            .get(&(name.clone(), user_id))
            .is_some_and(Membership::is_active)
    }

    fn rejoin(
        &mut self,
        name: &SubdisceptoName,
        role_domain: RoleDomainId,
        user_id: UserId,
    ) -> AppResult<()> {
        let membership = self
            .memberships
            .get_mut(&(name.clone(), user_id))
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "membership of user {user_id} in subdiscepto '{name}'"
                ))
            })?;
        membership.left_at = None;

        if self.holds_preset_role(user_id, role_domain, PresetRole::CommonAfterRejoin) {
            self.unassign_preset_role(user_id, role_domain, PresetRole::CommonAfterRejoin);
            self.assign_preset_role(user_id, role_domain, PresetRole::Common)?;
        }

        Ok(())
    }
}

#[async_trait]
impl SubdisceptoRepository for InMemoryDisceptoStore {
    async fn find_subdiscepto(&self, name: &SubdisceptoName) -> AppResult<Subdiscepto> {
        self.read(|state| state.subdiscepto(name).cloned()).await
    }

    async fn create_subdiscepto(
        &self,
        creator: UserId,
        subdiscepto: NewSubdiscepto,
        seeds: &[PresetRoleSeed],
        creator_roles: &[PresetRole],
    ) -> AppResult<Subdiscepto> {
        self.write(|state| {
            let NewSubdiscepto { name, settings } = subdiscepto;
            if state.subdisceptos.contains_key(&name) {
                return Err(AppError::AlreadyExists(format!(
                    "subdiscepto '{name}' already exists"
                )));
            }

            let role_domain = RoleDomainId::new(state.next_id());
            let created = Subdiscepto {
                name: name.clone(),
                description: settings.description,
                min_length: settings.min_length,
                questions_required: settings.questions_required,
                nsfw: settings.nsfw,
                public: settings.public,
                role_domain,
            };
            state.subdisceptos.insert(name.clone(), created.clone());
            state.memberships.insert(
                (name.clone(), creator),
                Membership {
                    subdiscepto: name,
                    user_id: creator,
                    joined_at: Utc::now(),
                    left_at: None,
                },
            );

            state.ensure_preset_roles(role_domain, seeds)?;
            for preset in creator_roles {
                state.assign_preset_role(creator, role_domain, *preset)?;
            }

            Ok(created)
        })
        .await
    }

    async fn update_subdiscepto(
        &self,
        name: &SubdisceptoName,
        settings: &SubdisceptoSettings,
    ) -> AppResult<()> {
        self.write(|state| {
            let subdiscepto = state
                .subdisceptos
                .get_mut(name)
                .ok_or_else(|| AppError::NotFound(format!("subdiscepto '{name}'")))?;

            subdiscepto.description = settings.description.clone();
            subdiscepto.min_length = settings.min_length;
            subdiscepto.questions_required = settings.questions_required;
            subdiscepto.nsfw = settings.nsfw;
            subdiscepto.public = settings.public;
            Ok(())
        })
        .await
    }

    async fn delete_subdiscepto(&self, subdiscepto: &Subdiscepto) -> AppResult<()> {
        self.write(|state| {
            state.subdisceptos.remove(&subdiscepto.name);
            state
                .memberships
                .retain(|(name, _), _| *name != subdiscepto.name);

            let essays: Vec<EssayId> = state
                .essays
                .values()
                .filter(|essay| essay.posted_in == subdiscepto.name)
                .map(|essay| essay.id)
                .collect();
            for essay_id in essays {
                state.delete_essay(essay_id);
            }

            state.delete_role_domain(subdiscepto.role_domain);
            Ok(())
        })
        .await
    }

    async fn find_membership(
        &self,
        name: &SubdisceptoName,
        user_id: UserId,
    ) -> AppResult<Option<Membership>> {
        self.read(|state| Ok(state.memberships.get(&(name.clone(), user_id)).cloned()))
            .await
    }

    async fn list_members(&self, subdiscepto: &Subdiscepto) -> AppResult<Vec<Member>> {
        self.read(|state| {
            let mut memberships: Vec<&Membership> = state
                .memberships
                .values()
                .filter(|membership| membership.subdiscepto == subdiscepto.name)
                .collect();
            memberships.sort_by_key(|membership| (membership.joined_at, membership.user_id));

            Ok(memberships
                .into_iter()
                .filter_map(|membership| {
                    let user = state.users.get(&membership.user_id)?;
                    Some(Member {
                        user_id: user.id,
                        name: user.name.clone(),
                        left_at: membership.left_at,
                        roles: state.user_roles(user.id, subdiscepto.role_domain),
                    })
                })
                .collect())
        })
        .await
    }

    async fn list_subdisceptos(
        &self,
        viewer: Option<UserId>,
    ) -> AppResult<Vec<SubdisceptoSummary>> {
        self.read(|state| {
            Ok(state
                .subdisceptos
                .values()
                .filter_map(|subdiscepto| {
                    let is_member = viewer
                        .is_some_and(|user_id| state.is_active_member(&subdiscepto.name, user_id));
                    if !subdiscepto.public && !is_member {
                        return None;
                    }

                    let members_count = state
                        .memberships
                        .values()
                        .filter(|membership| {
                            membership.subdiscepto == subdiscepto.name && membership.is_active()
                        })
                        .count();
                    Some(SubdisceptoSummary {
                        name: subdiscepto.name.clone(),
                        description: subdiscepto.description.clone(),
                        public: subdiscepto.public,
                        members_count: i64::try_from(members_count).unwrap_or(i64::MAX),
                        is_member,
                    })
                })
                .collect())
        })
        .await
    }

    async fn list_user_subdisceptos(&self, user_id: UserId) -> AppResult<Vec<SubdisceptoName>> {
        self.read(|state| {
            Ok(state
                .memberships
                .values()
                .filter(|membership| membership.user_id == user_id && membership.is_active())
                .map(|membership| membership.subdiscepto.clone())
                .collect())
        })
        .await
    }

    async fn join_subdiscepto(
        &self,
        subdiscepto: &Subdiscepto,
        user_id: UserId,
    ) -> AppResult<MembershipChange> {
        self.write(|state| {
            let key = (subdiscepto.name.clone(), user_id);
            if state.memberships.contains_key(&key) {
                state.rejoin(&subdiscepto.name, subdiscepto.role_domain, user_id)?;
                return Ok(MembershipChange::Rejoined);
            }

            state.memberships.insert(
                key,
                Membership {
                    subdiscepto: subdiscepto.name.clone(),
                    user_id,
                    joined_at: Utc::now(),
                    left_at: None,
                },
            );
            state.assign_preset_role(user_id, subdiscepto.role_domain, PresetRole::Common)?;
            Ok(MembershipChange::Joined)
        })
        .await
    }

    async fn leave_subdiscepto(
        &self,
        subdiscepto: &Subdiscepto,
        user_id: UserId,
        keep_rejoin_marker: bool,
    ) -> AppResult<()> {
        self.write(|state| {
            let membership = state
                .memberships
                .get_mut(&(subdiscepto.name.clone(), user_id))
                .filter(|membership| membership.is_active())
                .ok_or_else(|| {
                    AppError::NotFound(format!(
                        "membership of user {user_id} in subdiscepto '{}'",
                        subdiscepto.name
                    ))
                })?;
            membership.left_at = Some(Utc::now());

            state.unassign_all_roles(user_id, subdiscepto.role_domain);
            if keep_rejoin_marker {
                state.assign_preset_role(
                    user_id,
                    subdiscepto.role_domain,
                    PresetRole::CommonAfterRejoin,
                )?;
            }
            Ok(())
        })
        .await
    }
}
