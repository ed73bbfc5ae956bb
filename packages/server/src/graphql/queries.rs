use serde::Deserialize;

use super::GraphQLRequest;
use crate::models::user::Role;

pub const INSERT_WORK: &str = r#"mutation($content: String!, $status: work_status_enum!, $requestedTeacherID: Int) {
  insert_works_one(object: {content: $content, status: $status, teacher_id: $requestedTeacherID}) {
    id
  }
}"#;

pub const INSERT_ESSAY: &str = r#"mutation($workID: Int!, $subjectID: Int!) {
  insert_essays_one(object: {work_id: $workID, title_id: $subjectID}) {
    __typename
  }
}"#;

pub const INSERT_CHARACTERIZATION: &str = r#"mutation($workID: Int!, $subjectID: Int!) {
  insert_characterizations_one(object: {work_id: $workID, character_id: $subjectID}) {
    __typename
  }
}"#;

pub const DELETE_WORK: &str = r#"mutation($id: Int!) {
  delete_works_by_pk(id: $id) {
    id
  }
}"#;

pub const USER: &str = r#"query($id: Int!) {
  users(where: {id: {_eq: $id}}) {
    role
    updated_at
  }
}"#;

#[derive(Debug, Deserialize)]
pub struct InsertWorkOutput {
    #[serde(rename = "insert_works_one")]
    pub work: WorkId,
}

#[derive(Debug, Deserialize)]
pub struct WorkId {
    pub id: i32,
}

#[derive(Debug, Deserialize)]
pub struct UserOutput {
    pub users: Vec<UserRow>,
}

#[derive(Debug, Deserialize)]
pub struct UserRow {
    pub role: Role,
    /// Set once the user has completed their profile. Only presence matters,
    /// so the column's timestamp format is not parsed.
    pub updated_at: Option<String>,
}

impl UserRow {
    pub fn is_registered(&self) -> bool {
        self.updated_at.is_some()
    }
}

pub fn user_by_id(id: i32) -> GraphQLRequest {
    GraphQLRequest::new(USER).var("id", id)
}
