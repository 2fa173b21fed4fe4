// Team roster and role resolution

use serde::{Deserialize, Serialize};

use crate::submission::{Category, TeamId};

/// One team from the configured roster. Static at runtime; changing the
/// roster later does not retroactively alter past submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Slug used as the stored `team_id`.
    pub id: TeamId,
    /// Human-readable name used in announcements.
    pub display_name: String,
    /// Chat role marking membership of this team.
    pub role_name: String,
    /// Per-team channel receiving decision broadcasts.
    pub channel_name: String,
}

/// Outcome of matching a caller's role set against the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleMatch<'a> {
    /// No role on the caller corresponds to a roster team.
    None,
    /// Exactly one team role found.
    One(&'a Team),
    /// The caller carries more than one team role. The source bot picked
    /// the iteration-order winner here; we refuse instead and report the
    /// conflicting role names.
    Ambiguous(Vec<String>),
}

/// Fixed lookup surface over the configured teams and categories.
#[derive(Debug, Clone)]
pub struct TeamRegistry {
    teams: Vec<Team>,
    categories: Vec<String>,
}

impl TeamRegistry {
    pub fn new(teams: Vec<Team>, categories: Vec<String>) -> Self {
        Self { teams, categories }
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn team(&self, id: &TeamId) -> Option<&Team> {
        self.teams.iter().find(|t| &t.id == id)
    }

    /// Looks a team up by slug or display name, case-insensitively.
    pub fn find_team(&self, name: &str) -> Option<&Team> {
        self.teams.iter().find(|t| {
            t.id.0.eq_ignore_ascii_case(name) || t.display_name.eq_ignore_ascii_case(name)
        })
    }

    /// Resolves the caller's team from their role set.
    pub fn resolve_team_role(&self, roles: &[String]) -> RoleMatch<'_> {
        let matches: Vec<&Team> = self
            .teams
            .iter()
            .filter(|team| {
                roles
                    .iter()
                    .any(|role| role.eq_ignore_ascii_case(&team.role_name))
            })
            .collect();

        match matches.as_slice() {
            [] => RoleMatch::None,
            [team] => RoleMatch::One(team),
            many => RoleMatch::Ambiguous(many.iter().map(|t| t.role_name.clone()).collect()),
        }
    }

    /// Validates a category name against the configured list, returning
    /// the canonical form.
    pub fn category(&self, name: &str) -> Option<Category> {
        self.categories
            .iter()
            .find(|c| c.eq_ignore_ascii_case(name.trim()))
            .map(|c| Category(c.clone()))
    }
}
