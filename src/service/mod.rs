pub mod directory;
pub mod employee;
pub mod net_salary;
pub mod project;
pub mod salary;
pub mod validation;
