pub mod capture;
pub mod drafts;
pub mod helpers;
pub mod site;
pub mod sync;
