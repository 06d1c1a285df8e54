use std::str::FromStr;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use super::{BackendError, Employee, EmployeeDetail, EmployeeDirectory, LeaveBalance};

/// Demo staff: (emp_id, name, department, position, join_date, manager, email)
#[rustfmt::skip]
const DEMO_EMPLOYEES: &[(&str, &str, &str, &str, &str, Option<&str>, &str)] = &[
    ("EMP001", "Rajesh Kumar", "Engineering", "Senior Developer", "2020-03-15",
        Some("EMP010"), "rajesh.kumar@company.com"),
    ("EMP002", "Priya Sharma", "HR", "HR Manager", "2019-01-10",
        Some("EMP010"), "priya.sharma@company.com"),
    ("EMP003", "Amit Patel", "Engineering", "DevOps Engineer", "2021-06-20",
        Some("EMP010"), "amit.patel@company.com"),
    ("EMP004", "Sneha Reddy", "Marketing", "Marketing Executive", "2022-02-14",
        Some("EMP009"), "sneha.reddy@company.com"),
    ("EMP005", "Vikram Singh", "Sales", "Sales Manager", "2018-11-05",
        Some("EMP010"), "vikram.singh@company.com"),
    ("EMP006", "Ananya Iyer", "Engineering", "Junior Developer", "2023-01-10",
        Some("EMP001"), "ananya.iyer@company.com"),
    ("EMP007", "Rahul Gupta", "Finance", "Accountant", "2020-08-22",
        Some("EMP008"), "rahul.gupta@company.com"),
    ("EMP008", "Meera Nair", "Finance", "Finance Manager", "2017-05-15",
        Some("EMP010"), "meera.nair@company.com"),
    ("EMP009", "Karthik Rao", "Marketing", "Marketing Head", "2019-07-30",
        Some("EMP010"), "karthik.rao@company.com"),
    ("EMP010", "Sunita Desai", "Executive", "CEO", "2015-01-01",
        None, "sunita.desai@company.com"),
];

const EMPLOYEE_COLUMNS: &str = "emp_id, name, department, position, join_date, manager, email";

/// Employee records in SQLite.
pub struct SqliteEmployeeDirectory {
    pool: SqlitePool,
}

impl SqliteEmployeeDirectory {
    /// Opens (creating if needed) the database at `url`, e.g.
    /// `sqlite://data/employees.db`.
    pub async fn connect(url: &str) -> Result<Self, BackendError> {
        tracing::info!("Opening employee database: {url}");
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let directory = Self { pool };
        directory.initialize_schema().await?;
        Ok(directory)
    }

    /// Single-connection in-memory database. Every pooled connection to
    /// `sqlite::memory:` would otherwise see its own empty database.
    pub async fn in_memory() -> Result<Self, BackendError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let directory = Self { pool };
        directory.initialize_schema().await?;
        Ok(directory)
    }

    pub async fn initialize_schema(&self) -> Result<(), BackendError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS employees (
                emp_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                department TEXT NOT NULL,
                position TEXT NOT NULL,
                join_date TEXT NOT NULL,
                manager TEXT,
                email TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS leave_balance (
                emp_id TEXT PRIMARY KEY,
                casual_leave INTEGER DEFAULT 0,
                earned_leave INTEGER DEFAULT 0,
                sick_leave INTEGER DEFAULT 0,
                last_updated TEXT NOT NULL,
                FOREIGN KEY (emp_id) REFERENCES employees(emp_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replaces all rows with the demo staff and their leave balances.
    /// Returns the number of employees written.
    pub async fn seed_demo_data(&self, today: NaiveDate) -> Result<usize, BackendError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM leave_balance").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM employees").execute(&mut *tx).await?;

        for &(emp_id, name, department, position, join_date, manager, email) in DEMO_EMPLOYEES {
            sqlx::query(
                r#"
                INSERT INTO employees
                    (emp_id, name, department, position, join_date, manager, email)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(emp_id)
            .bind(name)
            .bind(department)
            .bind(position)
            .bind(join_date)
            .bind(manager)
            .bind(email)
            .execute(&mut *tx)
            .await?;

            let joined = NaiveDate::parse_from_str(join_date, "%Y-%m-%d")
                .map_err(|e| BackendError::InvalidInput(format!("join date {join_date}: {e}")))?;
            let balance = leave_for_tenure(months_between(joined, today), today);
            sqlx::query(
                r#"
                INSERT INTO leave_balance
                    (emp_id, casual_leave, earned_leave, sick_leave, last_updated)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(emp_id)
            .bind(balance.casual_leave)
            .bind(balance.earned_leave)
            .bind(balance.sick_leave)
            .bind(&balance.last_updated)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!("Seeded {} demo employees", DEMO_EMPLOYEES.len());
        Ok(DEMO_EMPLOYEES.len())
    }
}

fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    let months = (to.year() - from.year()) as i64 * 12 + to.month() as i64 - from.month() as i64;
    if to.day() < from.day() {
        months - 1
    } else {
        months
    }
}

/// Full-year allowances once an employee has a year of tenure (12 casual,
/// 18 earned, 7 sick), pro-rata below that. The remaining balance varies with
/// tenure so the demo rows differ from each other.
fn leave_for_tenure(months: i64, today: NaiveDate) -> LeaveBalance {
    let months = months.max(0);
    let (casual, earned, sick) = if months >= 12 {
        (3 + months % 10, 8 + months % 11, 2 + months % 6)
    } else {
        (1 + months % 6, 3 + months % 8, 1 + months % 4)
    };
    LeaveBalance {
        casual_leave: casual,
        earned_leave: earned,
        sick_leave: sick,
        last_updated: today.format("%Y-%m-%d").to_string(),
    }
}

/// `EMP007`, `emp007`, `7` and `007` all resolve to `EMP007`.
fn normalize_emp_id(raw: &str) -> Result<String, BackendError> {
    let trimmed = raw.trim();
    let digits = match trimmed.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("emp") => &trimmed[3..],
        _ => trimmed,
    };
    let number: u32 = digits
        .parse()
        .map_err(|_| BackendError::InvalidInput(format!("'{raw}' is not an employee ID")))?;
    Ok(format!("EMP{number:03}"))
}

#[async_trait]
impl EmployeeDirectory for SqliteEmployeeDirectory {
    async fn get_employee(&self, emp_id: &str) -> Result<EmployeeDetail, BackendError> {
        let emp_id = normalize_emp_id(emp_id)?;
        let row = sqlx::query(
            r#"
            SELECT e.emp_id, e.name, e.department, e.position, e.join_date, e.manager, e.email,
                   l.casual_leave, l.earned_leave, l.sick_leave, l.last_updated
            FROM employees e
            LEFT JOIN leave_balance l ON e.emp_id = l.emp_id
            WHERE e.emp_id = ?
            "#,
        )
        .bind(&emp_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| BackendError::NotFound(format!("Employee {emp_id}")))?;

        let employee = Employee {
            emp_id: row.try_get("emp_id")?,
            name: row.try_get("name")?,
            department: row.try_get("department")?,
            position: row.try_get("position")?,
            join_date: row.try_get("join_date")?,
            manager: row.try_get("manager")?,
            email: row.try_get("email")?,
        };
        let last_updated: Option<String> = row.try_get("last_updated")?;
        let leave_balance = match last_updated {
            Some(last_updated) => Some(LeaveBalance {
                casual_leave: row.try_get("casual_leave")?,
                earned_leave: row.try_get("earned_leave")?,
                sick_leave: row.try_get("sick_leave")?,
                last_updated,
            }),
            None => None,
        };

        Ok(EmployeeDetail {
            employee,
            leave_balance,
        })
    }

    async fn search_employees(&self, name: &str) -> Result<Vec<Employee>, BackendError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BackendError::InvalidInput("name must not be empty".into()));
        }
        let employees = sqlx::query_as::<_, Employee>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees \
             WHERE instr(lower(name), lower(?)) > 0 ORDER BY emp_id"
        ))
        .bind(name)
        .fetch_all(&self.pool)
        .await?;
        Ok(employees)
    }

    async fn employees_by_department(
        &self,
        department: &str,
    ) -> Result<Vec<Employee>, BackendError> {
        let employees = sqlx::query_as::<_, Employee>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees \
             WHERE lower(department) = lower(?) ORDER BY emp_id"
        ))
        .bind(department.trim())
        .fetch_all(&self.pool)
        .await?;
        Ok(employees)
    }

    async fn all_employees(&self) -> Result<Vec<Employee>, BackendError> {
        let employees = sqlx::query_as::<_, Employee>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY emp_id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(employees)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    pub(crate) async fn seeded() -> SqliteEmployeeDirectory {
        let directory = SqliteEmployeeDirectory::in_memory().await.unwrap();
        directory.seed_demo_data(today()).await.unwrap();
        directory
    }

    #[test]
    fn normalizes_employee_ids() {
        assert_eq!(normalize_emp_id("EMP001").unwrap(), "EMP001");
        assert_eq!(normalize_emp_id("emp7").unwrap(), "EMP007");
        assert_eq!(normalize_emp_id("10").unwrap(), "EMP010");
        assert!(matches!(
            normalize_emp_id("boss"),
            Err(BackendError::InvalidInput(_))
        ));
    }

    #[test]
    fn tenure_months_respect_day_of_month() {
        let joined = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(months_between(joined, NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()), 11);
        assert_eq!(months_between(joined, NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()), 12);
    }

    #[test]
    fn leave_stays_within_yearly_allowance() {
        for months in 0..120 {
            let balance = leave_for_tenure(months, today());
            assert!((1..=12).contains(&balance.casual_leave));
            assert!((3..=18).contains(&balance.earned_leave));
            assert!((1..=7).contains(&balance.sick_leave));
        }
    }

    #[tokio::test]
    async fn get_employee_includes_leave_balance() {
        let directory = seeded().await;
        let detail = directory.get_employee("1").await.unwrap();

        assert_eq!(detail.employee.name, "Rajesh Kumar");
        assert_eq!(detail.employee.manager.as_deref(), Some("EMP010"));
        let leave = detail.leave_balance.unwrap();
        assert_eq!(leave.last_updated, "2025-06-01");
    }

    #[tokio::test]
    async fn unknown_employee_is_not_found() {
        let directory = seeded().await;
        let err = directory.get_employee("EMP999").await.unwrap_err();
        assert_eq!(err.to_string(), "Employee EMP999 not found");
    }

    #[tokio::test]
    async fn search_is_case_insensitive_substring() {
        let directory = seeded().await;
        let found = directory.search_employees("sharma").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].emp_id, "EMP002");

        let found = directory.search_employees("a").await.unwrap();
        assert_eq!(found.len(), 10);
        assert!(directory.search_employees("  ").await.is_err());
    }

    #[tokio::test]
    async fn department_listing_is_ordered() {
        let directory = seeded().await;
        let engineering = directory.employees_by_department("engineering").await.unwrap();
        let ids: Vec<&str> = engineering.iter().map(|e| e.emp_id.as_str()).collect();
        assert_eq!(ids, vec!["EMP001", "EMP003", "EMP006"]);

        assert!(directory.employees_by_department("Legal").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reseeding_replaces_rows() {
        let directory = seeded().await;
        directory.seed_demo_data(today()).await.unwrap();
        assert_eq!(directory.all_employees().await.unwrap().len(), 10);
    }
}
