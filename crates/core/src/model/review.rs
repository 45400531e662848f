use serde::{Deserialize, Serialize};

use super::Resource;
use super::validate::Violations;
use crate::collection::Collection;
use crate::error::DomainError;
use crate::id::{ResourceId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootcamp: Option<ResourceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserId>,
}

impl Resource for Review {
    const COLLECTION: Collection = Collection::Reviews;
    const MANAGED_FIELDS: &'static [&'static str] = &["bootcamp", "user"];

    fn validate(&self) -> Result<(), DomainError> {
        let mut v = Violations::new();
        v.required(self.title.as_deref(), "Please add a title for the review")
            .max_len(self.title.as_deref(), 100, "Title can not be more than 100 characters")
            .required(self.text.as_deref(), "Please add some text")
            .check(
                self.rating.is_some_and(|r| (1.0..=10.0).contains(&r)),
                "Please add a rating between 1 and 10",
            )
            .check(self.bootcamp.is_some(), "Review must belong to a bootcamp")
            .check(self.user.is_some(), "Review must belong to a user");
        v.finish()
    }
}
