use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{Connection, OptionalExtension, ToSql, params, params_from_iter};
use tracing::warn;

use crate::import::{ImportStore, StoreConnector};
use crate::models::{
    BRAND_MAX_CHARS, Category, CategoryCount, ClearSummary, DEFAULT_SERVING_SIZE,
    DEFAULT_SERVING_WEIGHT_G, DESCRIPTION_MAX_CHARS, DatabaseStats, Food, FoodSample,
    NAME_MAX_CHARS, NutritionFacts, ParsedFood, USDA_DATA_SOURCE, WrittenFood, truncate_chars,
};
use crate::nutrients::{Nutrient, NutrientMap};

const FOOD_COLUMNS: &str = "food_id, category_id, name, description, brand, serving_size, \
     serving_weight_g, data_source, is_verified, fdc_id, import_run, created_at";

#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_busy_timeout(path, None)
    }

    /// Open with a lock wait applied before the schema is read, so a busy
    /// file fails after `busy_timeout` rather than rusqlite's default.
    pub fn open_with_busy_timeout(path: &Path, busy_timeout: Option<Duration>) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        if let Some(timeout) = busy_timeout {
            conn.busy_timeout(timeout)
                .context("Failed to set busy timeout")?;
        }
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        let db = Database { conn };
        db.configure()?;
        db.migrate()?;
        Ok(db)
    }

    fn configure(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(())
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS food_categories (
                    category_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    description TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS foods (
                    food_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    category_id INTEGER NOT NULL REFERENCES food_categories(category_id),
                    name TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    brand TEXT,
                    serving_size TEXT NOT NULL,
                    serving_weight_g REAL NOT NULL,
                    data_source TEXT NOT NULL,
                    is_verified INTEGER NOT NULL DEFAULT 0,
                    fdc_id INTEGER,
                    import_run TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS nutrition_facts (
                    nutrition_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    food_id INTEGER NOT NULL UNIQUE REFERENCES foods(food_id),
                    calories REAL,
                    protein_g REAL,
                    fat_g REAL,
                    carbohydrates_g REAL,
                    fiber_g REAL,
                    sugar_g REAL,
                    cholesterol_mg REAL,
                    sodium_mg REAL,
                    potassium_mg REAL,
                    calcium_mg REAL,
                    iron_mg REAL,
                    magnesium_mg REAL,
                    phosphorus_mg REAL,
                    zinc_mg REAL,
                    vitamin_a_iu REAL,
                    vitamin_c_mg REAL,
                    vitamin_d_iu REAL,
                    vitamin_b12_mcg REAL,
                    folate_mcg REAL
                );

                CREATE INDEX IF NOT EXISTS idx_food_categories_name ON food_categories(name);
                CREATE INDEX IF NOT EXISTS idx_foods_category ON foods(category_id);
                CREATE INDEX IF NOT EXISTS idx_foods_fdc_id ON foods(fdc_id);
                CREATE INDEX IF NOT EXISTS idx_foods_name ON foods(name);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Transactions ---

    /// Open a transaction unless one is already running.
    pub fn begin(&self) -> Result<()> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }

    pub fn commit(&self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn
                .execute_batch("COMMIT")
                .context("Failed to commit transaction")?;
        }
        Ok(())
    }

    pub fn rollback(&self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn
                .execute_batch("ROLLBACK")
                .context("Failed to roll back transaction")?;
        }
        Ok(())
    }

    // --- Row mapping helpers ---

    fn food_from_row(row: &rusqlite::Row) -> rusqlite::Result<Food> {
        Ok(Food {
            food_id: row.get(0)?,
            category_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            brand: row.get(4)?,
            serving_size: row.get(5)?,
            serving_weight_g: row.get(6)?,
            data_source: row.get(7)?,
            is_verified: row.get(8)?,
            fdc_id: row.get(9)?,
            import_run: row.get(10)?,
            created_at: row.get(11)?,
        })
    }

    fn category_from_row(row: &rusqlite::Row) -> rusqlite::Result<Category> {
        Ok(Category {
            category_id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    // --- Categories ---

    /// Id of the category called exactly `name`, creating it if needed.
    pub fn resolve_category(&self, name: &str) -> Result<i64> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT category_id FROM food_categories WHERE name = ?1 ORDER BY category_id LIMIT 1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        let now = Local::now().to_rfc3339();
        let description = format!("{name} foods from USDA FoodData Central");
        self.conn
            .execute(
                "INSERT INTO food_categories (name, description, created_at) VALUES (?1, ?2, ?3)",
                params![name, description, now],
            )
            .with_context(|| format!("Failed to create category '{name}'"))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_category(&self, id: i64) -> Result<Category> {
        self.conn
            .query_row(
                "SELECT category_id, name, description, created_at FROM food_categories WHERE category_id = ?1",
                params![id],
                Self::category_from_row,
            )
            .context("Category not found")
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self.conn.prepare(
            "SELECT category_id, name, description, created_at FROM food_categories ORDER BY name",
        )?;
        let categories = stmt
            .query_map([], Self::category_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    // --- Foods ---

    /// Insert one food and, when calories are known, its nutrition facts.
    ///
    /// A failed nutrition insert is logged and leaves the food in place.
    pub fn write_food(
        &self,
        category_id: i64,
        food: &ParsedFood,
        import_run: Option<&str>,
    ) -> Result<WrittenFood> {
        let food_id = self
            .insert_food(category_id, food, import_run)
            .with_context(|| format!("Failed to insert food '{}'", food.name))?;

        if food.calories().is_none() {
            return Ok(WrittenFood {
                food_id,
                nutrition_recorded: false,
            });
        }

        let nutrition_recorded = match self.insert_nutrition(food_id, &food.nutrition) {
            Ok(()) => true,
            Err(e) => {
                warn!(food_id, "failed to insert nutrition facts: {e:#}");
                false
            }
        };
        Ok(WrittenFood {
            food_id,
            nutrition_recorded,
        })
    }

    fn insert_food(&self, category_id: i64, food: &ParsedFood, import_run: Option<&str>) -> Result<i64> {
        let now = Local::now().to_rfc3339();
        let brand = food
            .brand
            .as_deref()
            .map(|b| truncate_chars(b, BRAND_MAX_CHARS))
            .filter(|b| !b.is_empty());
        self.conn.execute(
            "INSERT INTO foods (category_id, name, description, brand, serving_size, serving_weight_g, data_source, is_verified, fdc_id, import_run, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                category_id,
                truncate_chars(&food.name, NAME_MAX_CHARS),
                truncate_chars(&food.description, DESCRIPTION_MAX_CHARS),
                brand,
                DEFAULT_SERVING_SIZE,
                DEFAULT_SERVING_WEIGHT_G,
                USDA_DATA_SOURCE,
                true,
                food.fdc_id,
                import_run,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_nutrition(&self, food_id: i64, nutrition: &NutrientMap) -> Result<()> {
        let columns: Vec<&str> = Nutrient::ALL.iter().map(|n| n.column()).collect();
        let placeholders: Vec<String> = (1..=columns.len() + 1).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO nutrition_facts (food_id, {}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );

        let values: Vec<Option<f64>> = Nutrient::ALL
            .iter()
            .map(|n| nutrition.get(n).copied())
            .collect();
        let args = std::iter::once(&food_id as &dyn ToSql)
            .chain(values.iter().map(|v| v as &dyn ToSql));

        let mut stmt = self.conn.prepare_cached(&sql)?;
        stmt.execute(params_from_iter(args))?;
        Ok(())
    }

    pub fn get_food(&self, id: i64) -> Result<Food> {
        self.conn
            .query_row(
                &format!("SELECT {FOOD_COLUMNS} FROM foods WHERE food_id = ?1"),
                params![id],
                Self::food_from_row,
            )
            .context("Food not found")
    }

    pub fn get_nutrition(&self, food_id: i64) -> Result<Option<NutritionFacts>> {
        let columns: Vec<&str> = Nutrient::ALL.iter().map(|n| n.column()).collect();
        let sql = format!(
            "SELECT {} FROM nutrition_facts WHERE food_id = ?1",
            columns.join(", ")
        );
        let values = self
            .conn
            .query_row(&sql, params![food_id], |row| {
                let mut values = NutrientMap::new();
                for (i, nutrient) in Nutrient::ALL.iter().enumerate() {
                    if let Some(v) = row.get::<_, Option<f64>>(i)? {
                        values.insert(*nutrient, v);
                    }
                }
                Ok(values)
            })
            .optional()?;
        Ok(values.map(|values| NutritionFacts { food_id, values }))
    }

    pub fn food_exists(&self, fdc_id: i64) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM foods WHERE fdc_id = ?1)",
            params![fdc_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    // --- Maintenance ---

    pub fn stats(&self) -> Result<DatabaseStats> {
        let food_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM foods", [], |row| row.get(0))?;
        let nutrition_count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM nutrition_facts", [], |row| row.get(0))?;

        let mut stmt = self.conn.prepare(
            "SELECT fc.name, COUNT(f.food_id) AS food_count
             FROM food_categories fc
             LEFT JOIN foods f ON fc.category_id = f.category_id
             GROUP BY fc.category_id, fc.name
             ORDER BY food_count DESC, fc.name",
        )?;
        let categories = stmt
            .query_map([], |row| {
                Ok(CategoryCount {
                    name: row.get(0)?,
                    food_count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self
            .conn
            .prepare("SELECT food_id, name, brand FROM foods ORDER BY food_id LIMIT 5")?;
        let samples = stmt
            .query_map([], |row| {
                Ok(FoodSample {
                    food_id: row.get(0)?,
                    name: row.get(1)?,
                    brand: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DatabaseStats {
            food_count,
            nutrition_count,
            categories,
            samples,
        })
    }

    /// Delete every nutrition row, food, and category, children first.
    pub fn clear_all(&self) -> Result<ClearSummary> {
        let tx = self.conn.unchecked_transaction()?;
        let nutrition_facts_deleted = tx.execute("DELETE FROM nutrition_facts", [])?;
        let foods_deleted = tx.execute("DELETE FROM foods", [])?;
        let categories_deleted = tx.execute("DELETE FROM food_categories", [])?;
        tx.commit().context("Failed to clear food data")?;
        Ok(ClearSummary {
            nutrition_facts_deleted,
            foods_deleted,
            categories_deleted,
        })
    }

    pub fn sqlite_version(&self) -> Result<String> {
        Ok(self
            .conn
            .query_row("SELECT sqlite_version()", [], |row| row.get(0))?)
    }

    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

impl ImportStore for Database {
    fn resolve_category(&mut self, name: &str) -> Result<i64> {
        self.begin()?;
        Database::resolve_category(self, name)
    }

    fn write_food(&mut self, category_id: i64, food: &ParsedFood, run_id: &str) -> Result<WrittenFood> {
        self.begin()?;
        Database::write_food(self, category_id, food, Some(run_id))
    }

    fn contains_fdc_id(&mut self, fdc_id: i64) -> Result<bool> {
        self.food_exists(fdc_id)
    }

    fn commit(&mut self) -> Result<()> {
        Database::commit(self)
    }

    fn rollback(&mut self) -> Result<()> {
        Database::rollback(self)
    }
}

/// Opens a fresh [`Database`] on every connect.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    path: PathBuf,
    busy_timeout: Option<Duration>,
}

impl SqliteConnector {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: None,
        }
    }

    /// How long a statement waits on another connection's lock before
    /// failing with `SQLITE_BUSY`. Unset keeps rusqlite's default.
    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

impl StoreConnector for SqliteConnector {
    type Store = Database;

    fn connect(&self) -> Result<Database> {
        Database::open_with_busy_timeout(&self.path, self.busy_timeout)
    }
}
