pub mod issue_url;
pub mod poll;
