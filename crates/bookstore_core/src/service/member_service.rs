//! Member registration and membership use cases.
//!
//! # Invariants
//! - Emails are unique across members.
//! - Membership only moves REGULAR -> PREMIUM through `upgrade_membership`.
//! - Members with active loans cannot be deleted.

use crate::clock::Clock;
use crate::event::{DomainEvent, EventBus};
use crate::model::member::{
    Member, MemberDraft, MemberId, MemberLoanLimit, MemberUpdate, MembershipType,
};
use crate::model::page::{Page, PageRequest};
use crate::repo::loan_repo::LoanRepository;
use crate::repo::member_repo::{MemberQuery, MemberRepository};
use crate::service::error::{ServiceError, ServiceResult, MEMBER_HAS_ACTIVE_LOANS};
use log::info;
use std::sync::Arc;

pub struct MemberService<M: MemberRepository, L: LoanRepository> {
    members: M,
    loans: L,
    events: Arc<EventBus>,
    clock: Arc<dyn Clock>,
}

impl<M: MemberRepository, L: LoanRepository> MemberService<M, L> {
    pub fn new(members: M, loans: L, events: Arc<EventBus>, clock: Arc<dyn Clock>) -> Self {
        Self {
            members,
            loans,
            events,
            clock,
        }
    }

    /// Registers a member. Tier defaults to `REGULAR`.
    pub fn create_member(&self, draft: &MemberDraft) -> ServiceResult<Member> {
        let draft = draft.normalized()?;
        if self.members.email_exists(&draft.email)? {
            return Err(ServiceError::DuplicateEmail(draft.email));
        }

        let tier = draft.membership_type.unwrap_or(MembershipType::Regular);
        let member = self
            .members
            .create_member(&draft, tier, self.clock.now_ms())?;
        info!(
            "event=member_create module=service status=ok member_id={} tier={}",
            member.id, member.membership_type
        );

        self.events.publish(&DomainEvent::MemberRegistered {
            member_id: member.id,
            name: member.name.clone(),
            email: member.email.clone(),
        });
        Ok(member)
    }

    pub fn get_member(&self, id: MemberId) -> ServiceResult<Member> {
        self.members
            .get_member(id)?
            .ok_or_else(|| ServiceError::not_found("Member", id))
    }

    pub fn list_members(&self, request: PageRequest) -> ServiceResult<Page<Member>> {
        let mut query = MemberQuery::default();
        let total = self.members.count_members(&query)?;
        query.limit = Some(request.size);
        query.offset = request.offset();
        Ok(Page::new(self.members.list_members(&query)?, request, total))
    }

    /// Applies the non-blank fields of `update`.
    pub fn update_member(&self, id: MemberId, update: &MemberUpdate) -> ServiceResult<Member> {
        let mut member = self.get_member(id)?;
        let update = update.normalized()?;

        if let Some(name) = update.name {
            member.name = name;
        }
        if let Some(email) = update.email {
            if let Some(owner) = self.members.find_member_by_email(&email)? {
                if owner.id != id {
                    return Err(ServiceError::DuplicateEmail(email));
                }
            }
            member.email = email;
        }

        self.members.update_member(&member)?;
        info!("event=member_update module=service status=ok member_id={id}");
        Ok(member)
    }

    pub fn delete_member(&self, id: MemberId) -> ServiceResult<()> {
        self.get_member(id)?;
        let active = self.loans.count_active_loans_for_member(id)?;
        if active > 0 {
            return Err(ServiceError::invalid_state(
                MEMBER_HAS_ACTIVE_LOANS,
                format!("member {id} still has {active} active loan(s)"),
            ));
        }

        self.members.delete_member(id)?;
        info!("event=member_delete module=service status=ok member_id={id}");
        Ok(())
    }

    /// Blank input yields an empty list.
    pub fn search_by_name(&self, name: &str) -> ServiceResult<Vec<Member>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.members.list_members(&MemberQuery {
            name: Some(name.to_string()),
            ..MemberQuery::default()
        })?)
    }

    pub fn members_by_type(&self, membership_type: MembershipType) -> ServiceResult<Vec<Member>> {
        Ok(self.members.list_members(&MemberQuery {
            membership_type: Some(membership_type),
            ..MemberQuery::default()
        })?)
    }

    pub fn upgrade_membership(
        &self,
        id: MemberId,
        target: MembershipType,
    ) -> ServiceResult<Member> {
        let mut member = self.get_member(id)?;
        let from = member.membership_type;
        if !from.can_upgrade_to(target) {
            return Err(ServiceError::MembershipUpgrade(format!(
                "membership cannot change from {from} to {target}"
            )));
        }

        member.membership_type = target;
        self.members.update_member(&member)?;
        info!(
            "event=member_upgrade module=service status=ok member_id={id} from={from} to={target}"
        );

        self.events.publish(&DomainEvent::MembershipUpgraded {
            member_id: member.id,
            email: member.email.clone(),
            from,
            to: target,
        });
        Ok(member)
    }

    /// Whether `email` is already registered.
    pub fn email_exists(&self, email: &str) -> ServiceResult<bool> {
        Ok(self.members.email_exists(email.trim())?)
    }

    pub fn loan_limit(&self, id: MemberId) -> ServiceResult<MemberLoanLimit> {
        let member = self.get_member(id)?;
        let current = self.loans.count_active_loans_for_member(id)?;
        Ok(MemberLoanLimit::compute(&member, current))
    }
}
