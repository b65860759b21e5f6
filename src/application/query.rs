//! GraphQL documents sent to the remote API.

use chrono::{DateTime, FixedOffset, Utc};
use serde_json::Value;

use super::batch::SubQueryTemplate;
use super::pagination::PagedQuery;
use crate::domain::{AllianceId, NationLookup, Resource, War};

const ALLIANCE_REF_FIELDS: &str = "id name acronym";

const ALLIANCE_FIELDS: &str =
    "id name acronym score color date accept_members flag discord_link";

const CITY_FIELDS: &str = "id infrastructure barracks factory hangar drydock";

const TREATY_FIELDS: &str = "id date treaty_type treaty_url turns_left alliance1_id alliance2_id \
     approved alliance1 { id name acronym } alliance2 { id name acronym }";

const WAR_FIELDS: &str = "id date end_date reason war_type turns_left att_id def_id \
     att_alliance_id def_alliance_id winner_id att_money_looted def_money_looted \
     att_infra_destroyed_value def_infra_destroyed_value \
     attacks { id date type att_id money_stolen }";

const NATION_SUMMARY_FIELDS: &str =
    "id nation_name leader_name alliance_id last_active score num_cities vacation_mode_turns";

const PAGINATOR: &str = "paginatorInfo { currentPage lastPage }";

fn nation_fields() -> String {
    format!(
        "id nation_name leader_name alliance_id alliance_position continent color discord_id \
         war_policy domestic_policy num_cities score population date last_active \
         vacation_mode_turns beige_turns soldiers tanks aircraft ships missiles nukes spies \
         wars_won wars_lost cities {{ {CITY_FIELDS} }} alliance {{ {ALLIANCE_FIELDS} }}"
    )
}

/// Escape text for a GraphQL string literal.
#[must_use]
pub fn graphql_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Per-alliance member query, batched by alias.
#[must_use]
pub fn alliance_nations_template() -> SubQueryTemplate {
    SubQueryTemplate::new(format!(
        "alliances(id: {{id}}) {{ data {{ {ALLIANCE_REF_FIELDS} nations {{ {} }} }} }}",
        nation_fields()
    ))
}

#[must_use]
pub fn alliance_treaties(id: AllianceId) -> String {
    format!("{{ alliances(id: {id}) {{ data {{ id treaties {{ {TREATY_FIELDS} }} }} }} }}")
}

/// Exact-name alliance lookup, one row at most.
#[must_use]
pub fn alliance_by_name(name: &str) -> String {
    format!("{{ {} }}", alliance_by_name_field(name))
}

/// The root field of [`alliance_by_name`], for aliased batches.
#[must_use]
pub fn alliance_by_name_field(name: &str) -> String {
    format!(
        "alliances(first: 1, name: [{}]) {{ data {{ {ALLIANCE_REF_FIELDS} }} }}",
        graphql_string(name)
    )
}

/// Alliances whose name equals any of `names`.
#[must_use]
pub fn alliances_by_names(names: &[String]) -> String {
    let list: Vec<String> = names.iter().map(|n| graphql_string(n)).collect();
    format!(
        "{{ alliances(first: {}, name: [{}]) {{ data {{ {ALLIANCE_REF_FIELDS} }} }} }}",
        names.len().max(1),
        list.join(", ")
    )
}

#[must_use]
pub fn nation(lookup: &NationLookup) -> String {
    let filter = match lookup {
        NationLookup::Id(id) => format!("id: [{id}]"),
        NationLookup::Name(name) => format!("nation_name: [{}]", graphql_string(name.trim())),
        NationLookup::Leader(name) => format!("leader_name: [{}]", graphql_string(name.trim())),
    };
    format!("{{ nations(first: 1, {filter}) {{ data {{ {} }} }} }}", nation_fields())
}

/// Latest trade price row.
#[must_use]
pub fn latest_trade_prices() -> String {
    let columns: Vec<&str> = Resource::ALL.iter().map(|r| r.field()).collect();
    format!(
        "{{ tradeprices(first: 1, orderBy: [{{column: DATE, order: DESC}}]) \
         {{ data {{ date {} }} }} }}",
        columns.join(" ")
    )
}

/// Wars involving an alliance, newest first.
#[derive(Debug, Clone, Copy)]
pub struct AllianceWarsQuery {
    pub alliance: AllianceId,
    pub local: FixedOffset,
}

impl PagedQuery for AllianceWarsQuery {
    fn root_field(&self) -> &str {
        "wars"
    }

    fn page_document(&self, page: u32, first: u32) -> String {
        format!(
            "{{ wars(alliance_id: [{}], first: {first}, page: {page}, \
             orderBy: [{{column: DATE, order: DESC}}]) {{ data {{ {WAR_FIELDS} }} \
             {PAGINATOR} }} }}",
            self.alliance
        )
    }

    /// Active wars never count as older than a cutoff.
    fn item_timestamp(&self, item: &Value) -> Option<DateTime<Utc>> {
        let war: War = serde_json::from_value(item.clone()).ok()?;
        if war.is_active() {
            return None;
        }
        war.latest_activity(self.local)
    }
}

/// Every alliance's identity, by ascending id.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllianceTableQuery;

impl PagedQuery for AllianceTableQuery {
    fn root_field(&self) -> &str {
        "alliances"
    }

    fn page_document(&self, page: u32, first: u32) -> String {
        format!(
            "{{ alliances(first: {first}, page: {page}, orderBy: [{{column: ID, order: ASC}}]) \
             {{ data {{ {ALLIANCE_REF_FIELDS} }} {PAGINATOR} }} }}"
        )
    }
}

/// Nations outside any alliance and not in vacation mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnalliedNationsQuery;

impl PagedQuery for UnalliedNationsQuery {
    fn root_field(&self) -> &str {
        "nations"
    }

    fn page_document(&self, page: u32, first: u32) -> String {
        format!(
            "{{ nations(first: {first}, page: {page}, alliance_id: [0], vmode: false, \
             orderBy: [{{column: ID, order: ASC}}]) \
             {{ data {{ {NATION_SUMMARY_FIELDS} }} {PAGINATOR} }} }}"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NationId;
    use serde_json::json;

    #[test]
    fn names_are_escaped_in_lookups() {
        let doc = alliance_by_name(r#"The "Best" Alliance"#);
        assert!(doc.contains(r#"name: ["The \"Best\" Alliance"]"#));
    }

    #[test]
    fn nation_lookup_filters() {
        assert!(nation(&NationLookup::Id(NationId::new(7))).contains("nations(first: 1, id: [7])"));
        assert!(nation(&NationLookup::Leader(" Bob ".into())).contains(r#"leader_name: ["Bob"]"#));
    }

    #[test]
    fn template_renders_alliance_id() {
        let sub = alliance_nations_template().render("9445");
        assert!(sub.starts_with("alliances(id: 9445) { data { id name acronym nations {"));
    }

    #[test]
    fn wars_page_is_ordered_newest_first() {
        let query = AllianceWarsQuery {
            alliance: AllianceId::new(9445),
            local: FixedOffset::east_opt(0).unwrap(),
        };
        let doc = query.page_document(3, 500);
        assert!(doc.contains("wars(alliance_id: [9445], first: 500, page: 3"));
        assert!(doc.contains("order: DESC"));
        assert!(doc.contains("paginatorInfo"));
    }

    #[test]
    fn active_wars_have_no_cutoff_timestamp() {
        let query = AllianceWarsQuery {
            alliance: AllianceId::new(1),
            local: FixedOffset::east_opt(0).unwrap(),
        };
        let active = json!({"id": "1", "date": "2020-01-01T00:00:00Z", "turns_left": 5,
                            "att_id": "1", "def_id": "2"});
        let ended = json!({"id": "2", "date": "2020-01-01T00:00:00Z", "turns_left": 0,
                           "att_id": "1", "def_id": "2"});
        assert!(query.item_timestamp(&active).is_none());
        assert!(query.item_timestamp(&ended).is_some());
    }

    #[test]
    fn trade_prices_request_every_resource() {
        let doc = latest_trade_prices();
        for r in Resource::ALL {
            assert!(doc.contains(r.field()));
        }
    }
}
