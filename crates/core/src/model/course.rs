use serde::{Deserialize, Serialize};

use super::Resource;
use super::validate::{Violations, string_or_number};
use crate::collection::Collection;
use crate::error::DomainError;
use crate::id::{ResourceId, UserId};

pub const MINIMUM_SKILLS: [&str; 3] = ["beginner", "intermediate", "advanced"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub weeks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuition: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_skill: Option<String>,
    #[serde(default)]
    pub scholarship_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootcamp: Option<ResourceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserId>,
}

impl Resource for Course {
    const COLLECTION: Collection = Collection::Courses;
    const MANAGED_FIELDS: &'static [&'static str] = &["bootcamp", "user"];

    fn validate(&self) -> Result<(), DomainError> {
        let mut v = Violations::new();
        v.required(self.title.as_deref(), "Please add a course title")
            .required(self.description.as_deref(), "Please add a description")
            .required(self.weeks.as_deref(), "Please add number of weeks")
            .check(self.tuition.is_some(), "Please add a tuition cost")
            .check(
                self.tuition.is_none_or(|t| t >= 0.0),
                "Tuition cost can not be negative",
            )
            .check(
                self.minimum_skill
                    .as_deref()
                    .is_some_and(|s| MINIMUM_SKILLS.contains(&s)),
                "Please add a minimum skill of beginner, intermediate or advanced",
            )
            .check(self.bootcamp.is_some(), "Course must belong to a bootcamp")
            .check(self.user.is_some(), "Course must belong to a user");
        v.finish()
    }
}
