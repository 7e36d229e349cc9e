//! Phase-one generators. Records carry natural keys (game names, cities,
//! mock customer ids); surrogate foreign keys are only filled in by
//! [`crate::resolve`].

pub mod customers;
pub mod expenses;
pub mod inventory;
pub mod participations;
pub mod relationships;
pub mod rentals;
pub mod sales;
pub mod staff;
pub mod tournaments;

pub use customers::{Customer, materialize_customers};
pub use expenses::{MaintenanceExpense, generate_expenses};
pub use inventory::{Inventory, InventoryUnit, generate_inventory};
pub use participations::{Participation, generate_participations};
pub use relationships::{Relationship, generate_relationships};
pub use rentals::{Rental, RentalOutcome, generate_rentals};
pub use sales::{Sale, SalesOutcome, generate_sales};
pub use staff::{ShiftGrid, StaffMember, generate_staff};
pub use tournaments::{Tournament, generate_tournaments, max_depth_per_game};

/// Everything the generators produce before keys are resolved.
#[derive(Debug, Clone)]
pub struct GeneratedRecords {
    pub staff: Vec<StaffMember>,
    pub relationships: Vec<Relationship>,
    pub expenses: Vec<MaintenanceExpense>,
    pub tournaments: Vec<Tournament>,
    pub inventory: Inventory,
    pub sales: Vec<Sale>,
    pub rentals: Vec<Rental>,
    pub participations: Vec<Participation>,
    pub customers: Vec<Customer>,
}
