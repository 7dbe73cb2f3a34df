//! Visibility filter
//!
//! Narrows ticket collections to what the requesting [`Viewer`] may see.
//! The same rule is available in memory ([`VisibilityScope::permits`]) and
//! as a SQL predicate ([`VisibilityScope::push_sql`]) so listings can
//! paginate after filtering.

use std::collections::BTreeSet;

use shared::models::{GROUP_SEMI_ADMIN, Ticket};
use sqlx::{QueryBuilder, Sqlite};

/// Identity snapshot resolved once per request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: i64,
    pub username: String,
    pub is_superuser: bool,
    pub groups: BTreeSet<String>,
    pub display_name: String,
    pub permitted_countries: BTreeSet<i64>,
}

impl Viewer {
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }

    pub fn is_semi_admin(&self) -> bool {
        self.in_group(GROUP_SEMI_ADMIN)
    }

    /// Superusers and semi-admins may edit any ticket they can see
    pub fn can_edit_any(&self) -> bool {
        self.is_superuser || self.is_semi_admin()
    }

    pub fn may_use_country(&self, country_id: Option<i64>) -> bool {
        match country_id {
            _ if self.is_superuser => true,
            Some(id) => self.permitted_countries.contains(&id),
            None => false,
        }
    }

    pub fn scope(&self) -> VisibilityScope {
        VisibilityScope::for_viewer(self)
    }
}

/// Matching form of a person's name: trimmed, inner whitespace collapsed,
/// lowercase
pub fn canonical_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityScope {
    /// Superuser: no narrowing
    All,
    /// No country grants
    Nothing,
    /// Semi-admin: every ticket in the permitted countries
    Countries(BTreeSet<i64>),
    /// Regular user: tickets in the permitted countries assigned to them
    AssignedInCountries {
        countries: BTreeSet<i64>,
        responsible_key: String,
    },
}

impl VisibilityScope {
    /// First matching rule wins
    pub fn for_viewer(viewer: &Viewer) -> Self {
        if viewer.is_superuser {
            return Self::All;
        }
        if viewer.permitted_countries.is_empty() {
            return Self::Nothing;
        }
        if viewer.is_semi_admin() {
            return Self::Countries(viewer.permitted_countries.clone());
        }
        Self::AssignedInCountries {
            countries: viewer.permitted_countries.clone(),
            responsible_key: canonical_name(&viewer.display_name),
        }
    }

    pub fn permits(&self, ticket: &Ticket) -> bool {
        match self {
            Self::All => true,
            Self::Nothing => false,
            Self::Countries(countries) => in_countries(countries, ticket.country_id),
            Self::AssignedInCountries {
                countries,
                responsible_key,
            } => {
                in_countries(countries, ticket.country_id)
                    && ticket
                        .responsible_party
                        .as_deref()
                        .is_some_and(|name| canonical_name(name) == *responsible_key)
            }
        }
    }

    pub fn filter<I>(&self, tickets: I) -> Vec<Ticket>
    where
        I: IntoIterator<Item = Ticket>,
    {
        tickets.into_iter().filter(|t| self.permits(t)).collect()
    }

    /// Append this scope as a boolean SQL expression over alias `t`
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            Self::All => {
                qb.push("1 = 1");
            }
            Self::Nothing => {
                qb.push("1 = 0");
            }
            Self::Countries(countries) => push_country_in(qb, countries),
            Self::AssignedInCountries {
                countries,
                responsible_key,
            } => {
                qb.push("(");
                push_country_in(qb, countries);
                qb.push(" AND t.responsible_key = ");
                qb.push_bind(responsible_key.clone());
                qb.push(")");
            }
        }
    }
}

fn in_countries(countries: &BTreeSet<i64>, country_id: Option<i64>) -> bool {
    country_id.is_some_and(|id| countries.contains(&id))
}

fn push_country_in(qb: &mut QueryBuilder<'_, Sqlite>, countries: &BTreeSet<i64>) {
    if countries.is_empty() {
        qb.push("1 = 0");
        return;
    }
    qb.push("t.country_id IN (");
    let mut separated = qb.separated(", ");
    for id in countries {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const A: i64 = 1;
    const B: i64 = 2;
    const C: i64 = 3;

    fn ticket(id: i64, country: Option<i64>, responsible: Option<&str>) -> Ticket {
        let mut t = Ticket::blank(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        t.id = id;
        t.country_id = country;
        t.responsible_party = responsible.map(str::to_string);
        t
    }

    fn viewer(countries: &[i64], groups: &[&str]) -> Viewer {
        Viewer {
            user_id: 7,
            username: "jdoe".into(),
            is_superuser: false,
            groups: groups.iter().map(|g| g.to_string()).collect(),
            display_name: "Jane Doe".into(),
            permitted_countries: countries.iter().copied().collect(),
        }
    }

    fn collection() -> Vec<Ticket> {
        vec![
            ticket(1, Some(A), Some("Jane Doe")),
            ticket(2, Some(A), Some("John Smith")),
            ticket(3, Some(C), Some("Jane Doe")),
        ]
    }

    fn ids(tickets: Vec<Ticket>) -> Vec<i64> {
        tickets.into_iter().map(|t| t.id).collect()
    }

    #[test]
    fn regular_user_sees_own_tickets_in_granted_countries() {
        let scope = viewer(&[A, B], &[]).scope();
        assert_eq!(ids(scope.filter(collection())), vec![1]);
    }

    #[test]
    fn semi_admin_sees_whole_granted_countries() {
        let scope = viewer(&[A, B], &[GROUP_SEMI_ADMIN]).scope();
        assert_eq!(ids(scope.filter(collection())), vec![1, 2]);
    }

    #[test]
    fn superuser_sees_everything() {
        let mut v = viewer(&[], &[]);
        v.is_superuser = true;
        let mut all = collection();
        all.push(ticket(4, None, None));
        assert_eq!(ids(v.scope().filter(all)), vec![1, 2, 3, 4]);
    }

    #[test]
    fn no_grants_means_nothing_even_for_semi_admin() {
        for groups in [&[][..], &[GROUP_SEMI_ADMIN][..]] {
            let scope = viewer(&[], groups).scope();
            assert_eq!(scope, VisibilityScope::Nothing);
            let many: Vec<_> = (0..50).map(|i| ticket(i, Some(A), Some("Jane Doe"))).collect();
            assert!(scope.filter(many).is_empty());
        }
    }

    #[test]
    fn ticket_without_country_is_hidden_from_non_superusers() {
        let t = ticket(1, None, Some("Jane Doe"));
        assert!(!viewer(&[A], &[]).scope().permits(&t));
        assert!(!viewer(&[A], &[GROUP_SEMI_ADMIN]).scope().permits(&t));
    }

    #[test]
    fn name_matching_ignores_case_and_spacing() {
        let scope = viewer(&[A], &[]).scope();
        assert!(scope.permits(&ticket(1, Some(A), Some("  jane   DOE "))));
        assert!(!scope.permits(&ticket(2, Some(A), Some("Jane Doe Jr"))));
        assert!(!scope.permits(&ticket(3, Some(A), None)));
    }

    #[test]
    fn decision_depends_only_on_country_and_assignee() {
        let scope = viewer(&[A], &[]).scope();
        let mut a = ticket(1, Some(A), Some("Jane Doe"));
        let mut b = a.clone();
        a.brand = "ACME".into();
        b.serial = "SN-99".into();
        b.deadline = NaiveDate::from_ymd_opt(2023, 1, 1);
        assert_eq!(scope.permits(&a), scope.permits(&b));
    }

    #[test]
    fn canonical_name_collapses_whitespace() {
        assert_eq!(canonical_name("  Ana\tMaria  Souza "), "ana maria souza");
        assert_eq!(canonical_name("ÉLODIE"), "élodie");
        assert_eq!(canonical_name("   "), "");
    }

    #[test]
    fn sql_predicate_binds_countries_and_key() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT t.id FROM ticket t WHERE ");
        viewer(&[A, B], &[]).scope().push_sql(&mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT t.id FROM ticket t WHERE (t.country_id IN (?, ?) AND t.responsible_key = ?)"
        );

        let mut qb = QueryBuilder::<Sqlite>::new("");
        VisibilityScope::Nothing.push_sql(&mut qb);
        assert_eq!(qb.sql(), "1 = 0");
    }

    #[test]
    fn country_check_for_writes() {
        let v = viewer(&[A], &[]);
        assert!(v.may_use_country(Some(A)));
        assert!(!v.may_use_country(Some(B)));
        assert!(!v.may_use_country(None));
    }
}
