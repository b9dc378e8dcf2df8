#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Admin = 1,
    Hr = 2,
    Employee = 3,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Employee),
            _ => None,
        }
    }

    /// Roles that clock themselves in and out, as opposed to administrative
    /// roles that manage attendance for others.
    pub fn is_employee_class(&self) -> bool {
        matches!(self, Role::Employee)
    }
}
