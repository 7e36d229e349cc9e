//! Physical layout of the generated tables.
//!
//! Column order here is the positional order consumers insert rows in, so it
//! must not be changed without changing the downstream store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Id,
    Integer,
    Money,
    Text,
    Bool,
    Date,
    Timestamp,
}

/// A single column definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
}

/// Foreign key from a column to another table's primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKeyDef {
    pub column: &'static str,
    pub references: TableName,
}

/// Static definition of a generated table.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub table: TableName,
    pub columns: &'static [ColumnDef],
    pub foreign_keys: &'static [ForeignKeyDef],
}

impl TableSchema {
    /// The primary key is always the first column.
    pub fn primary_key(&self) -> &'static str {
        self.columns[0].name
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|column| column.name).collect()
    }
}

/// The fixed set of tables produced by a generation run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    City,
    Customers,
    ExpenseTitles,
    ExpenseTypes,
    Games,
    GameCategories,
    GamePrices,
    GameTypes,
    Inventory,
    Invoices,
    MaintenanceExpenses,
    Participations,
    Partners,
    Payments,
    Relationships,
    Rental,
    Sales,
    Staff,
    Tournaments,
}

impl TableName {
    pub const ALL: [TableName; 19] = [
        TableName::City,
        TableName::Customers,
        TableName::ExpenseTitles,
        TableName::ExpenseTypes,
        TableName::Games,
        TableName::GameCategories,
        TableName::GamePrices,
        TableName::GameTypes,
        TableName::Inventory,
        TableName::Invoices,
        TableName::MaintenanceExpenses,
        TableName::Participations,
        TableName::Partners,
        TableName::Payments,
        TableName::Relationships,
        TableName::Rental,
        TableName::Sales,
        TableName::Staff,
        TableName::Tournaments,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TableName::City => "city",
            TableName::Customers => "customers",
            TableName::ExpenseTitles => "expense_titles",
            TableName::ExpenseTypes => "expense_types",
            TableName::Games => "games",
            TableName::GameCategories => "game_categories",
            TableName::GamePrices => "game_prices",
            TableName::GameTypes => "game_types",
            TableName::Inventory => "inventory",
            TableName::Invoices => "invoices",
            TableName::MaintenanceExpenses => "maintenance_expenses",
            TableName::Participations => "participations",
            TableName::Partners => "partners",
            TableName::Payments => "payments",
            TableName::Relationships => "relationships",
            TableName::Rental => "rental",
            TableName::Sales => "sales",
            TableName::Staff => "staff",
            TableName::Tournaments => "tournaments",
        }
    }

    pub fn schema(self) -> &'static TableSchema {
        match self {
            TableName::City => &CITY,
            TableName::Customers => &CUSTOMERS,
            TableName::ExpenseTitles => &EXPENSE_TITLES,
            TableName::ExpenseTypes => &EXPENSE_TYPES,
            TableName::Games => &GAMES,
            TableName::GameCategories => &GAME_CATEGORIES,
            TableName::GamePrices => &GAME_PRICES,
            TableName::GameTypes => &GAME_TYPES,
            TableName::Inventory => &INVENTORY,
            TableName::Invoices => &INVOICES,
            TableName::MaintenanceExpenses => &MAINTENANCE_EXPENSES,
            TableName::Participations => &PARTICIPATIONS,
            TableName::Partners => &PARTNERS,
            TableName::Payments => &PAYMENTS,
            TableName::Relationships => &RELATIONSHIPS,
            TableName::Rental => &RENTAL,
            TableName::Sales => &SALES,
            TableName::Staff => &STAFF,
            TableName::Tournaments => &TOURNAMENTS,
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableName {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        TableName::ALL
            .into_iter()
            .find(|table| table.as_str() == value)
            .ok_or_else(|| format!("unknown table '{value}'"))
    }
}

const fn col(name: &'static str, kind: ColumnKind) -> ColumnDef {
    ColumnDef {
        name,
        kind,
        nullable: false,
    }
}

const fn opt(name: &'static str, kind: ColumnKind) -> ColumnDef {
    ColumnDef {
        name,
        kind,
        nullable: true,
    }
}

const fn fk(column: &'static str, references: TableName) -> ForeignKeyDef {
    ForeignKeyDef { column, references }
}

use ColumnKind::{Bool, Date, Id, Integer, Money, Text, Timestamp};

static CITY: TableSchema = TableSchema {
    table: TableName::City,
    columns: &[
        col("city_id", Id),
        col("city", Text),
        col("updated_at", Timestamp),
    ],
    foreign_keys: &[],
};

static CUSTOMERS: TableSchema = TableSchema {
    table: TableName::Customers,
    columns: &[
        col("customer_id", Id),
        col("first_name", Text),
        col("last_name", Text),
        col("phone", Text),
        col("email", Text),
        col("city_id", Id),
        col("updated_at", Timestamp),
    ],
    foreign_keys: &[fk("city_id", TableName::City)],
};

static EXPENSE_TITLES: TableSchema = TableSchema {
    table: TableName::ExpenseTitles,
    columns: &[
        col("title_id", Id),
        col("title", Text),
        col("expenses_type_id", Id),
        col("updated_at", Timestamp),
    ],
    foreign_keys: &[fk("expenses_type_id", TableName::ExpenseTypes)],
};

static EXPENSE_TYPES: TableSchema = TableSchema {
    table: TableName::ExpenseTypes,
    columns: &[
        col("expenses_type_id", Id),
        col("expenses_type", Text),
        col("updated_at", Timestamp),
    ],
    foreign_keys: &[],
};

static GAMES: TableSchema = TableSchema {
    table: TableName::Games,
    columns: &[
        col("game_id", Id),
        col("title", Text),
        opt("description", Text),
        col("category_id", Id),
        col("type_id", Id),
        col("competitivity", Bool),
        col("updated_at", Timestamp),
    ],
    foreign_keys: &[
        fk("category_id", TableName::GameCategories),
        fk("type_id", TableName::GameTypes),
    ],
};

static GAME_CATEGORIES: TableSchema = TableSchema {
    table: TableName::GameCategories,
    columns: &[
        col("category_id", Id),
        col("game_category", Text),
        col("updated_at", Timestamp),
    ],
    foreign_keys: &[],
};

static GAME_PRICES: TableSchema = TableSchema {
    table: TableName::GamePrices,
    columns: &[
        col("price_id", Id),
        col("current_price", Money),
        col("updated_at", Timestamp),
    ],
    foreign_keys: &[],
};

static GAME_TYPES: TableSchema = TableSchema {
    table: TableName::GameTypes,
    columns: &[
        col("type_id", Id),
        col("game_type", Text),
        col("updated_at", Timestamp),
    ],
    foreign_keys: &[],
};

static INVENTORY: TableSchema = TableSchema {
    table: TableName::Inventory,
    columns: &[
        col("inventory_id", Id),
        col("game_id", Id),
        col("destination", Text),
        opt("price_id", Id),
        col("active", Bool),
        col("purchase_payment_id", Id),
        col("delivery_date", Timestamp),
        col("updated_at", Timestamp),
    ],
    foreign_keys: &[
        fk("game_id", TableName::Games),
        fk("price_id", TableName::GamePrices),
        fk("purchase_payment_id", TableName::Payments),
    ],
};

static INVOICES: TableSchema = TableSchema {
    table: TableName::Invoices,
    columns: &[
        col("invoice_id", Id),
        col("date", Timestamp),
        col("updated_at", Timestamp),
    ],
    foreign_keys: &[],
};

static MAINTENANCE_EXPENSES: TableSchema = TableSchema {
    table: TableName::MaintenanceExpenses,
    columns: &[
        col("spend_id", Id),
        col("title_id", Id),
        col("payment_id", Id),
        col("date", Date),
        col("updated_at", Timestamp),
    ],
    foreign_keys: &[
        fk("title_id", TableName::ExpenseTitles),
        fk("payment_id", TableName::Payments),
    ],
};

static PARTICIPATIONS: TableSchema = TableSchema {
    table: TableName::Participations,
    columns: &[
        col("particip_id", Id),
        col("tournament_id", Id),
        col("customer_id", Id),
        col("place", Integer),
        col("sign_up_date", Timestamp),
        col("fee_payment_id", Id),
        col("updated_at", Timestamp),
    ],
    foreign_keys: &[
        fk("tournament_id", TableName::Tournaments),
        fk("customer_id", TableName::Customers),
        fk("fee_payment_id", TableName::Payments),
    ],
};

static PARTNERS: TableSchema = TableSchema {
    table: TableName::Partners,
    columns: &[
        col("partner_id", Id),
        col("name", Text),
        col("gender", Text),
        col("updated_at", Timestamp),
    ],
    foreign_keys: &[],
};

static PAYMENTS: TableSchema = TableSchema {
    table: TableName::Payments,
    columns: &[
        col("payment_id", Id),
        col("amount", Money),
        col("invoice_id", Id),
        col("updated_at", Timestamp),
    ],
    foreign_keys: &[fk("invoice_id", TableName::Invoices)],
};

static RELATIONSHIPS: TableSchema = TableSchema {
    table: TableName::Relationships,
    columns: &[
        col("relationship_id", Id),
        col("staff_id", Id),
        col("partner_id", Id),
        col("dates_number", Integer),
        col("updated_at", Timestamp),
    ],
    foreign_keys: &[
        fk("staff_id", TableName::Staff),
        fk("partner_id", TableName::Partners),
    ],
};

static RENTAL: TableSchema = TableSchema {
    table: TableName::Rental,
    columns: &[
        col("rental_id", Id),
        col("inventory_id", Id),
        col("customer_id", Id),
        col("rental_date", Timestamp),
        opt("return_date", Timestamp),
        col("staff_id", Id),
        col("payment_id", Id),
        opt("penalty_payment_id", Id),
        col("rate", Integer),
        col("updated_at", Timestamp),
    ],
    foreign_keys: &[
        fk("inventory_id", TableName::Inventory),
        fk("customer_id", TableName::Customers),
        fk("staff_id", TableName::Staff),
        fk("payment_id", TableName::Payments),
        fk("penalty_payment_id", TableName::Payments),
    ],
};

static SALES: TableSchema = TableSchema {
    table: TableName::Sales,
    columns: &[
        col("sale_id", Id),
        col("inventory_id", Id),
        col("staff_id", Id),
        col("payment_id", Id),
        col("date", Timestamp),
        col("return_oper", Bool),
        col("updated_at", Timestamp),
    ],
    foreign_keys: &[
        fk("inventory_id", TableName::Inventory),
        fk("staff_id", TableName::Staff),
        fk("payment_id", TableName::Payments),
    ],
};

static STAFF: TableSchema = TableSchema {
    table: TableName::Staff,
    columns: &[
        col("staff_id", Id),
        col("first_name", Text),
        col("last_name", Text),
        col("phone", Text),
        col("email", Text),
        col("city_id", Id),
        opt("current_salary", Money),
        col("is_manager", Bool),
        col("gender", Text),
        col("from_date", Date),
        opt("to_date", Date),
        col("updated_at", Timestamp),
    ],
    foreign_keys: &[fk("city_id", TableName::City)],
};

static TOURNAMENTS: TableSchema = TableSchema {
    table: TableName::Tournaments,
    columns: &[
        col("tournament_id", Id),
        col("name", Text),
        col("game_id", Id),
        col("start_time", Timestamp),
        col("matches", Integer),
        col("fee", Money),
        col("sign_up_deadline", Timestamp),
        col("staff_id", Id),
        col("expenses_payment_id", Id),
        col("updated_at", Timestamp),
    ],
    foreign_keys: &[
        fk("game_id", TableName::Games),
        fk("staff_id", TableName::Staff),
        fk("expenses_payment_id", TableName::Payments),
    ],
};
