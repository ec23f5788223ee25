use bookstore_core::db::open_db_in_memory;
use bookstore_core::event::{DomainEvent, EventListener, ListenerResult};
use bookstore_core::repo::book_repo::{BookRepository, SqliteBookRepository};
use bookstore_core::repo::loan_repo::{LoanRepository, SqliteLoanRepository};
use bookstore_core::repo::member_repo::SqliteMemberRepository;
use bookstore_core::{
    BookDraft, EventBus, FixedClock, MemberDraft, MemberService, MemberUpdate, MembershipType,
    PageRequest, ServiceError,
};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<DomainEvent>>,
}

impl EventListener for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    fn on_event(&self, event: &DomainEvent) -> ListenerResult {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

type Members<'conn> = MemberService<SqliteMemberRepository<'conn>, SqliteLoanRepository<'conn>>;

fn service(conn: &Connection, recorder: Arc<Recorder>) -> Members<'_> {
    let events = Arc::new(EventBus::new().with_listener(recorder));
    MemberService::new(
        SqliteMemberRepository::new(conn),
        SqliteLoanRepository::new(conn),
        events,
        Arc::new(FixedClock::new(5_000)),
    )
}

#[test]
fn create_member_defaults_to_regular_and_publishes_event() {
    let conn = open_db_in_memory().unwrap();
    let recorder = Arc::new(Recorder::default());
    let members = service(&conn, Arc::clone(&recorder));

    let member = members
        .create_member(&MemberDraft::new(" Hong Gildong ", "hong@example.com"))
        .unwrap();
    assert_eq!(member.name, "Hong Gildong");
    assert_eq!(member.membership_type, MembershipType::Regular);
    assert_eq!(member.join_date, 5_000);

    let events = recorder.events.lock().unwrap();
    assert_eq!(
        *events,
        vec![DomainEvent::MemberRegistered {
            member_id: member.id,
            name: "Hong Gildong".to_string(),
            email: "hong@example.com".to_string(),
        }]
    );
}

#[test]
fn duplicate_email_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let members = service(&conn, Arc::default());

    members
        .create_member(&MemberDraft::new("Kim", "kim@example.com"))
        .unwrap();
    let err = members
        .create_member(&MemberDraft::new("Kim Two", "kim@example.com"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::DuplicateEmail(_)));
    assert!(members.email_exists("kim@example.com").unwrap());
    assert!(!members.email_exists("lee@example.com").unwrap());
}

#[test]
fn partial_update_ignores_blank_fields_and_rechecks_email() {
    let conn = open_db_in_memory().unwrap();
    let members = service(&conn, Arc::default());

    let kim = members
        .create_member(&MemberDraft::new("Kim", "kim@example.com"))
        .unwrap();
    members
        .create_member(&MemberDraft::new("Lee", "lee@example.com"))
        .unwrap();

    let updated = members
        .update_member(
            kim.id,
            &MemberUpdate {
                name: Some("Kim Minsu".to_string()),
                email: Some("  ".to_string()),
            },
        )
        .unwrap();
    assert_eq!(updated.name, "Kim Minsu");
    assert_eq!(updated.email, "kim@example.com");

    let err = members
        .update_member(
            kim.id,
            &MemberUpdate {
                name: None,
                email: Some("lee@example.com".to_string()),
            },
        )
        .unwrap_err();
    assert_eq!(err.code(), "DUPLICATE_EMAIL");

    let same = members
        .update_member(
            kim.id,
            &MemberUpdate {
                name: None,
                email: Some(" kim@example.com ".to_string()),
            },
        )
        .unwrap();
    assert_eq!(same.email, "kim@example.com");
}

#[test]
fn upgrade_only_moves_regular_to_premium() {
    let conn = open_db_in_memory().unwrap();
    let recorder = Arc::new(Recorder::default());
    let members = service(&conn, Arc::clone(&recorder));

    let member = members
        .create_member(&MemberDraft::new("Park", "park@example.com"))
        .unwrap();
    let upgraded = members
        .upgrade_membership(member.id, MembershipType::Premium)
        .unwrap();
    assert_eq!(upgraded.membership_type, MembershipType::Premium);
    assert!(recorder.events.lock().unwrap().iter().any(|event| matches!(
        event,
        DomainEvent::MembershipUpgraded {
            from: MembershipType::Regular,
            to: MembershipType::Premium,
            ..
        }
    )));

    let err = members
        .upgrade_membership(member.id, MembershipType::Premium)
        .unwrap_err();
    assert_eq!(err.code(), "MEMBERSHIP_UPGRADE_ERROR");

    let err = members
        .upgrade_membership(member.id, MembershipType::Suspended)
        .unwrap_err();
    assert_eq!(err.code(), "MEMBERSHIP_UPGRADE_ERROR");
}

#[test]
fn search_and_list_members() {
    let conn = open_db_in_memory().unwrap();
    let members = service(&conn, Arc::default());

    for (name, email) in [
        ("Kim Minsu", "minsu@example.com"),
        ("Kim Jisoo", "jisoo@example.com"),
        ("Lee Hana", "hana@example.com"),
    ] {
        members.create_member(&MemberDraft::new(name, email)).unwrap();
    }
    let mut premium = MemberDraft::new("Choi Yuna", "yuna@example.com");
    premium.membership_type = Some(MembershipType::Premium);
    members.create_member(&premium).unwrap();

    assert_eq!(members.search_by_name("kim").unwrap().len(), 2);
    assert!(members.search_by_name(" ").unwrap().is_empty());
    assert_eq!(
        members
            .members_by_type(MembershipType::Premium)
            .unwrap()
            .len(),
        1
    );

    let page = members
        .list_members(PageRequest::new(Some(1), Some(3), 20))
        .unwrap();
    assert_eq!(page.total_elements, 4);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.content.len(), 1);
    assert_eq!(page.content[0].name, "Choi Yuna");
}

#[test]
fn delete_is_refused_while_loans_are_active() {
    let conn = open_db_in_memory().unwrap();
    let members = service(&conn, Arc::default());

    let member = members
        .create_member(&MemberDraft::new("Jung", "jung@example.com"))
        .unwrap();
    let book = SqliteBookRepository::new(&conn)
        .create_book(&BookDraft::new("Emma", "Jane Austen", "9780141439587", 850), 0)
        .unwrap();
    let loans = SqliteLoanRepository::new(&conn);
    let mut loan = loans.create_loan(member.id, book.id, 0, 10).unwrap();

    let limit = members.loan_limit(member.id).unwrap();
    assert_eq!(limit.current_loan_count, 1);
    assert_eq!(limit.remaining_loan_count, 4);

    assert_eq!(
        members.delete_member(member.id).unwrap_err().code(),
        "MEMBER_HAS_ACTIVE_LOANS"
    );

    loan.return_date = Some(5);
    loans.update_loan(&loan).unwrap();
    members.delete_member(member.id).unwrap();

    assert!(matches!(
        members.get_member(member.id),
        Err(ServiceError::NotFound { entity: "Member", .. })
    ));
    assert!(loans.get_loan(loan.id).unwrap().is_none());
}
