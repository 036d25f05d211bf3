//! The SQL intent catalog.
//!
//! Ships a built-in catalog of 19 intents grouped by id series (1xx basic
//! reads, 2xx aggregation, 3xx joins, 4xx subqueries, 5xx mutations). A
//! replacement catalog can be loaded from TOML as an `[[intents]]` array.

use std::collections::HashSet;

use iq_protocol::{Category, Intent, Operation};
use serde::Deserialize;

use crate::error::{EngineError, EngineResult};

/// Validated, immutable set of intents.
#[derive(Debug, Clone)]
pub struct Catalog {
    intents: Vec<Intent>,
}

#[derive(Deserialize)]
struct CatalogFile {
    intents: Vec<Intent>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate ids, out-of-range complexity
    /// and empty descriptions.
    pub fn new(intents: Vec<Intent>) -> EngineResult<Self> {
        let mut seen = HashSet::new();
        for intent in &intents {
            if !seen.insert(intent.id) {
                return Err(EngineError::Catalog(format!(
                    "duplicate intent id {}",
                    intent.id
                )));
            }
            if !(1..=5).contains(&intent.complexity) {
                return Err(EngineError::Catalog(format!(
                    "intent {} has complexity {}, expected 1-5",
                    intent.id, intent.complexity
                )));
            }
            if intent.text.trim().is_empty() {
                return Err(EngineError::Catalog(format!(
                    "intent {} has an empty description",
                    intent.id
                )));
            }
        }
        Ok(Self { intents })
    }

    pub fn from_toml_str(s: &str) -> EngineResult<Self> {
        let file: CatalogFile =
            toml::from_str(s).map_err(|e| EngineError::Catalog(e.to_string()))?;
        Self::new(file.intents)
    }

    pub fn from_file(path: &str) -> EngineResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn intents(&self) -> &[Intent] {
        &self.intents
    }

    pub fn get(&self, id: u32) -> Option<&Intent> {
        self.intents.iter().find(|i| i.id == id)
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    /// Total reference texts across all intents (before deduplication).
    pub fn reference_text_count(&self) -> usize {
        self.intents.iter().map(Intent::variant_count).sum()
    }

    /// The built-in 19-intent catalog.
    pub fn builtin() -> Self {
        Self {
            intents: builtin_intents(),
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

struct Spec<'a> {
    id: u32,
    operation: Operation,
    category: Category,
    complexity: u8,
    sql_pattern: &'a str,
    text: &'a str,
    keywords: &'a [&'a str],
    examples: &'a [&'a str],
    paraphrases: &'a [&'a str],
}

impl Spec<'_> {
    fn build(self) -> Intent {
        let owned = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect();
        Intent {
            id: self.id,
            operation: self.operation,
            category: self.category,
            complexity: self.complexity,
            sql_pattern: self.sql_pattern.into(),
            text: self.text.into(),
            examples: owned(self.examples),
            paraphrases: owned(self.paraphrases),
            keywords: owned(self.keywords),
        }
    }
}

fn builtin_intents() -> Vec<Intent> {
    use Category::*;
    use Operation::*;

    vec![
        // ── 100 series: basic reads ─────────────────────────────────
        Spec {
            id: 101,
            operation: SelectBasic,
            category: Read,
            complexity: 1,
            sql_pattern: "SELECT * FROM table",
            text: "Retrieve all rows or specific columns from a table without any conditions.",
            keywords: &["show", "list", "get", "display", "retrieve", "fetch"],
            examples: &[
                "show all employees",
                "list every product in the inventory",
                "get all customer records",
                "display the transaction logs",
                "fetch all rows from the data",
            ],
            paraphrases: &[
                "dump the table",
                "return the full dataset",
                "show me everything in the table",
            ],
        },
        Spec {
            id: 102,
            operation: SelectDistinct,
            category: Read,
            complexity: 2,
            sql_pattern: "SELECT DISTINCT column FROM table",
            text: "Retrieve unique values from a column, removing duplicates.",
            keywords: &["distinct", "unique", "different", "types of"],
            examples: &[
                "show unique countries in the user list",
                "list the different product categories available",
                "what are the unique job titles?",
                "get distinct status codes from logs",
            ],
            paraphrases: &[
                "remove duplicates and show list",
                "find all unique entries",
                "deduplicate the results",
            ],
        },
        // ── 110 series: row filtering and sorting ───────────────────
        Spec {
            id: 110,
            operation: SelectWhere,
            category: Read,
            complexity: 2,
            sql_pattern: "SELECT * FROM table WHERE condition",
            text: "Filter rows based on specific criteria or conditions.",
            keywords: &["where", "filtered by", "condition", "only", "specific"],
            examples: &[
                "show employees who live in New York",
                "list orders with status 'shipped'",
                "find products that cost less than 50 dollars",
                "get tickets created after 2023-01-01",
            ],
            paraphrases: &[
                "search for records matching X",
                "restrict results to specific condition",
                "get only the rows where X is true",
            ],
        },
        Spec {
            id: 111,
            operation: SelectOrderBy,
            category: Read,
            complexity: 2,
            sql_pattern: "SELECT * FROM table ORDER BY column [ASC/DESC]",
            text: "Retrieve rows sorted by one or more columns.",
            keywords: &[
                "sort",
                "order by",
                "arrange",
                "ascending",
                "descending",
                "alphabetical",
            ],
            examples: &[
                "list customers sorted by name",
                "show transactions ordered by date descending",
                "arrange products by price",
                "sort the employee list by join date",
            ],
            paraphrases: &[
                "organize the data by column",
                "put the results in order",
                "rank the rows simply",
            ],
        },
        Spec {
            id: 112,
            operation: SelectTopN,
            category: Read,
            complexity: 3,
            sql_pattern: "SELECT * FROM table ORDER BY col [ASC/DESC] LIMIT N",
            text: "Find the extreme values (highest/lowest/newest/oldest) by sorting and limiting.",
            keywords: &[
                "top",
                "bottom",
                "first",
                "latest",
                "cheapest",
                "most expensive",
                "highest",
                "lowest",
                "limit",
            ],
            examples: &[
                "find the cheapest employee",
                "show the top 5 highest paying jobs",
                "who are the 3 most recent signups?",
                "get the most expensive product",
                "list the bottom 10 performing students",
            ],
            paraphrases: &[
                "get the extreme values",
                "find the min or max records",
                "show the head or tail of the sorted list",
            ],
        },
        Spec {
            id: 113,
            operation: SelectFilterSortLimit,
            category: Read,
            complexity: 3,
            sql_pattern: "SELECT * FROM table WHERE condition ORDER BY col LIMIT N",
            text: "Filter data, sort the remaining results, and take the top N rows.",
            keywords: &["top", "most", "latest", "where", "filtered", "sorted"],
            examples: &[
                "show the 5 most recent active orders",
                "find the cheapest product in the 'Electronics' category",
                "who is the highest paid engineer?",
                "list the top 3 customers from Canada",
            ],
            paraphrases: &[
                "search, sort, and limit",
                "find best/worst within a specific category",
            ],
        },
        // ── 200 series: aggregation and analytics ───────────────────
        Spec {
            id: 201,
            operation: AggregateGlobal,
            category: Analytics,
            complexity: 2,
            sql_pattern: "SELECT COUNT(*) / SUM(col) / AVG(col) FROM table",
            text: "Calculate a single statistic (Count, Sum, Avg, Min, Max) for the entire dataset.",
            keywords: &["total", "count", "average", "sum", "how many", "overall"],
            examples: &[
                "how many users are there?",
                "what is the total revenue?",
                "calculate the average salary of all staff",
                "count the total number of orders",
            ],
            paraphrases: &[
                "calculate a global metric",
                "compute statistics for the whole table",
            ],
        },
        Spec {
            id: 202,
            operation: AggregateFiltered,
            category: Analytics,
            complexity: 3,
            sql_pattern: "SELECT AGG(col) FROM table WHERE condition",
            text: "Calculate a statistic for a specific filtered subset of data.",
            keywords: &["total", "count", "average", "where", "only"],
            examples: &[
                "how many active users are there?",
                "sum of sales for last month",
                "what is the average age of managers?",
                "count orders from the USA",
            ],
            paraphrases: &["metric calculation with a filter", "conditional aggregation"],
        },
        Spec {
            id: 210,
            operation: GroupByBasic,
            category: Analytics,
            complexity: 3,
            sql_pattern: "SELECT category, AGG(col) FROM table GROUP BY category",
            text: "Group rows by a specific column and calculate aggregates for each group.",
            keywords: &["per", "by", "each", "group by", "breakdown"],
            examples: &[
                "show total sales per country",
                "count the number of employees by department",
                "average grade for each class",
                "breakdown of expenses by category",
            ],
            paraphrases: &["segment the data", "aggregate data per group"],
        },
        Spec {
            id: 211,
            operation: GroupByFiltered,
            category: Analytics,
            complexity: 4,
            sql_pattern: "SELECT cat, AGG(col) FROM table WHERE cond GROUP BY cat",
            text: "Filter the raw data first, then group the remaining rows.",
            keywords: &["where", "per", "by", "each", "filtered"],
            examples: &[
                "show total sales per region for the year 2023",
                "count active users per platform",
                "average ticket resolution time per agent for high priority tickets",
            ],
            paraphrases: &["conditional grouping", "filter then segment"],
        },
        Spec {
            id: 220,
            operation: GroupByHaving,
            category: Analytics,
            complexity: 4,
            sql_pattern: "SELECT cat, AGG(col) FROM table GROUP BY cat HAVING AGG(col) condition",
            text: "Group data and then filter the groups based on the result of the aggregation.",
            keywords: &[
                "having",
                "more than",
                "greater than",
                "at least",
                "groups with",
            ],
            examples: &[
                "show departments with more than 10 employees",
                "which countries have total sales over 1 million?",
                "list categories that have an average price less than 50",
                "find classes with at least 20 students",
            ],
            paraphrases: &[
                "filter the results of a grouping",
                "restrict groups by their aggregate value",
            ],
        },
        Spec {
            id: 230,
            operation: GroupByOrdered,
            category: Analytics,
            complexity: 4,
            sql_pattern: "SELECT cat, AGG(col) FROM table GROUP BY cat ORDER BY AGG(col) DESC",
            text: "Group data, aggregate it, and then sort the results to find the top/bottom groups.",
            keywords: &["rank", "highest", "lowest", "most", "per", "by"],
            examples: &[
                "which country has the highest total sales?",
                "rank departments by number of employees",
                "show the top 5 product categories by revenue",
                "list sales reps ordered by their total deal value",
            ],
            paraphrases: &[
                "sort the grouped results",
                "find the top performing segments",
            ],
        },
        // ── 300 series: joins ───────────────────────────────────────
        Spec {
            id: 301,
            operation: JoinBasic,
            category: Read,
            complexity: 3,
            sql_pattern: "SELECT * FROM t1 JOIN t2 ON t1.id = t2.id",
            text: "Retrieve data combined from two or more related tables.",
            keywords: &["join", "combined with", "along with", "their", "related"],
            examples: &[
                "list employees and their department names",
                "show orders along with customer details",
                "get student names and the courses they are taking",
                "find products and their supplier information",
            ],
            paraphrases: &["merge data from two tables", "connect related entities"],
        },
        Spec {
            id: 302,
            operation: JoinAggregate,
            category: Analytics,
            complexity: 4,
            sql_pattern: "SELECT t1.name, COUNT(t2.id) FROM t1 JOIN t2 GROUP BY t1.name",
            text: "Join two tables and perform aggregation across the relationship.",
            keywords: &["per", "each", "count", "sum", "join", "related"],
            examples: &[
                "how many orders did each customer place?",
                "calculate total revenue per supplier",
                "count the number of students in each course",
                "average salary per department name",
            ],
            paraphrases: &["cross-table aggregation", "summarize related data"],
        },
        // ── 400 series: subqueries ──────────────────────────────────
        Spec {
            id: 401,
            operation: SubqueryFilter,
            category: Read,
            complexity: 5,
            sql_pattern: "SELECT * FROM table WHERE col IN (SELECT ...)",
            text: "Filter data using a list of values derived from another query.",
            keywords: &["who have", "that are in", "based on", "subquery"],
            examples: &[
                "show users who have placed an order in the last month",
                "find products that have never been sold",
                "list employees who belong to departments in New York",
            ],
            paraphrases: &[
                "nested filtering",
                "filter based on another table's result",
            ],
        },
        Spec {
            id: 402,
            operation: SubqueryComparison,
            category: Analytics,
            complexity: 5,
            sql_pattern: "SELECT * FROM table WHERE col > (SELECT AVG(col) FROM table)",
            text: "Compare individual rows against a global statistic (above average, below max, etc).",
            keywords: &[
                "above average",
                "below average",
                "higher than the mean",
                "outliers",
            ],
            examples: &[
                "users with salary greater than the average",
                "products priced higher than the average category price",
                "orders that are larger than the maximum order from yesterday",
            ],
            paraphrases: &["compare against the mean", "relative value search"],
        },
        // ── 500 series: mutations ───────────────────────────────────
        Spec {
            id: 501,
            operation: InsertRecord,
            category: Write,
            complexity: 2,
            sql_pattern: "INSERT INTO table VALUES (...)",
            text: "Add new records or rows to a database table.",
            keywords: &["add", "insert", "create", "new", "register"],
            examples: &[
                "add a new user named John",
                "create a new order for client X",
                "insert a record into the logs",
                "register a new employee",
            ],
            paraphrases: &["store a new entry", "append data to table"],
        },
        Spec {
            id: 502,
            operation: UpdateRecord,
            category: Write,
            complexity: 3,
            sql_pattern: "UPDATE table SET col=val WHERE condition",
            text: "Modify existing data based on specific conditions.",
            keywords: &["update", "change", "modify", "set", "correct"],
            examples: &[
                "update the status of order 123 to 'delivered'",
                "change Alice's email address",
                "modify the price of product X",
                "set all inactive users to archived",
            ],
            paraphrases: &["edit existing records", "alter data values"],
        },
        Spec {
            id: 503,
            operation: DeleteRecord,
            category: Write,
            complexity: 3,
            sql_pattern: "DELETE FROM table WHERE condition",
            text: "Remove records from a table permanently.",
            keywords: &["delete", "remove", "drop", "erase", "clear"],
            examples: &[
                "delete user 501",
                "remove all canceled orders",
                "erase logs older than 2020",
                "drop the record for product Y",
            ],
            paraphrases: &["remove rows from database", "clean up specific data"],
        },
    ]
    .into_iter()
    .map(Spec::build)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_nineteen_unique_intents() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.len(), 19);
        // Re-validating the built-in data must succeed.
        Catalog::new(catalog.intents().to_vec()).unwrap();
    }

    #[test]
    fn builtin_covers_every_operation_once() {
        let catalog = Catalog::builtin();
        for op in Operation::ALL {
            let n = catalog.intents().iter().filter(|i| i.operation == op).count();
            assert_eq!(n, 1, "{op} should appear exactly once");
        }
    }

    #[test]
    fn lookup_by_id() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.get(503).unwrap().operation, Operation::DeleteRecord);
        assert_eq!(catalog.get(101).unwrap().category, Category::Read);
        assert!(catalog.get(999).is_none());
    }

    #[test]
    fn write_intents_are_write_category() {
        let catalog = Catalog::builtin();
        for intent in catalog.intents() {
            assert_eq!(
                intent.operation.is_write(),
                intent.category == Category::Write,
                "intent {}",
                intent.id
            );
        }
    }

    #[test]
    fn duplicate_ids_rejected() {
        let intent = Catalog::builtin().get(101).unwrap().clone();
        let err = Catalog::new(vec![intent.clone(), intent]).unwrap_err();
        assert!(err.to_string().contains("duplicate intent id 101"));
    }

    #[test]
    fn complexity_out_of_range_rejected() {
        let mut intent = Catalog::builtin().get(101).unwrap().clone();
        intent.complexity = 9;
        assert!(Catalog::new(vec![intent]).is_err());
    }

    #[test]
    fn load_from_toml() {
        let toml = r#"
[[intents]]
id = 1
operation = "SELECT_BASIC"
category = "READ"
complexity = 1
text = "Retrieve rows."
examples = ["show rows"]

[[intents]]
id = 2
operation = "DELETE_RECORD"
category = "WRITE"
complexity = 3
text = "Remove rows."
keywords = ["delete"]
"#;
        let catalog = Catalog::from_toml_str(toml).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.reference_text_count(), 4);
        assert_eq!(catalog.get(2).unwrap().keywords, vec!["delete".to_string()]);
    }

    #[test]
    fn malformed_toml_is_catalog_error() {
        let err = Catalog::from_toml_str("intents = 3").unwrap_err();
        assert!(matches!(err, EngineError::Catalog(_)));
    }
}
