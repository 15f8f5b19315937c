use crate::models::{AccessTokenTable, NotificationTable, Table, UserTable, UserTokenTable};

/// Orders tables so that every table is created after the ones it references
/// and disposed before them.
pub struct SchemaManager {
    tables: Vec<Box<dyn Table>>,
}

impl SchemaManager {
    pub fn new(mut tables: Vec<Box<dyn Table>>) -> Self {
        Self::sort_tables(&mut tables);
        Self { tables }
    }

    fn sort_tables(tables: &mut Vec<Box<dyn Table>>) {
        let mut to_sort = std::mem::take(tables);
        let mut deps_list: Vec<_> = to_sort.iter().map(|t| t.dependencies()).collect();
        let mut sorted: Vec<Box<dyn Table>> = Vec::with_capacity(to_sort.len());

        while !to_sort.is_empty() {
            let ready: Vec<usize> = deps_list
                .iter()
                .enumerate()
                .filter(|(_, deps)| deps.is_empty())
                .map(|(i, _)| i)
                .collect();

            assert!(
                !ready.is_empty(),
                "Circular dependency detected or unresolved dependencies exist."
            );

            // Highest index first so swap_remove never moves a pending index.
            for &index in ready.iter().rev() {
                sorted.push(to_sort.swap_remove(index));
                deps_list.swap_remove(index);
            }

            for deps in deps_list.iter_mut() {
                deps.retain(|dep| !sorted.iter().any(|table| table.name() == *dep));
            }
        }

        *tables = sorted;
    }

    pub fn create_schema(&self) -> Vec<String> {
        self.tables.iter().map(|table| table.create()).collect()
    }

    pub fn dispose_schema(&self) -> Vec<String> {
        self.tables.iter().rev().map(|table| table.dispose()).collect()
    }
}

impl Default for SchemaManager {
    fn default() -> Self {
        SchemaManager::new(vec![
            Box::new(NotificationTable),
            Box::new(UserTokenTable),
            Box::new(AccessTokenTable),
            Box::new(UserTable),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockTable {
        name: &'static str,
        dependencies: Vec<&'static str>,
    }

    impl Table for MockTable {
        fn name(&self) -> &'static str {
            self.name
        }

        fn create(&self) -> String {
            format!("CREATE TABLE {};", self.name)
        }

        fn dispose(&self) -> String {
            format!("DROP TABLE {};", self.name)
        }

        fn dependencies(&self) -> Vec<&'static str> {
            self.dependencies.clone()
        }
    }

    fn table(name: &'static str, dependencies: Vec<&'static str>) -> Box<dyn Table> {
        Box::new(MockTable { name, dependencies })
    }

    #[test]
    fn test_creation_follows_dependencies() {
        let manager = SchemaManager::new(vec![
            table("notifications", vec!["users"]),
            table("access_tokens", vec!["users"]),
            table("users", vec![]),
        ]);

        let statements = manager.create_schema();

        assert_eq!(statements[0], "CREATE TABLE users;");
        assert_eq!(statements.len(), 3);
    }

    #[test]
    fn test_disposal_is_reverse_of_creation() {
        let manager = SchemaManager::new(vec![
            table("user_tokens", vec!["users"]),
            table("users", vec![]),
        ]);

        assert_eq!(
            manager.dispose_schema(),
            vec!["DROP TABLE user_tokens;", "DROP TABLE users;"]
        );
    }

    #[test]
    fn test_default_schema_creates_users_first() {
        let statements = SchemaManager::default().create_schema();

        assert!(statements[0].contains("CREATE TABLE IF NOT EXISTS users"));
    }

    #[test]
    #[should_panic(expected = "Circular dependency")]
    fn test_circular_dependency_panics() {
        SchemaManager::new(vec![table("a", vec!["b"]), table("b", vec!["a"])]);
    }
}
