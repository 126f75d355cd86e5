//! Link-base: a SQLite database storing a link database for random access.
//!
//! Loading a text link file requires reading all junction trees into memory.
//! A [`LinkBase`] stores each tree in a separate row indexed by the tail k-mer, so individual trees can be retrieved without loading the rest.
//!
//! ### Tables
//!
//! * `Tags(key, value)`: header information (version, k-mer length, color, number of trees and links).
//! * `Trees(tail, links)`: the links of each junction tree, encoded as in the text format.

use crate::error::{LinkError, Result};
use crate::jt::JunctionTree;
use crate::kmer::Kmer;
use crate::linkdb::LinkDatabase;
use crate::utils;

use std::fs;
use std::path::Path;

use log::info;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Statement};


//-----------------------------------------------------------------------------

/// A database connection to a Link-base database.
///
/// This structure stores a database connection and some header information.
/// The trees are accessed through the [`LinkInterface`] structure.
///
/// # Examples
///
/// ```
/// use linked_dbg::{utils, LinkBase, LinkDatabase};
/// use simple_sds::serialize;
/// use std::fs;
///
/// let mut links = LinkDatabase::with_color(5, Some(1));
/// links.get_or_create("TTCGA".parse().unwrap()).insert(b"TGGCG").unwrap();
///
/// // Create the database.
/// let db_file = serialize::temp_file_name("link-base");
/// assert!(!utils::file_exists(&db_file));
/// LinkBase::create(&links, &db_file).unwrap();
///
/// // Open the database and check the header.
/// let database = LinkBase::open(&db_file).unwrap();
/// assert_eq!(database.k(), 5);
/// assert_eq!(database.color(), Some(1));
/// assert_eq!(database.trees(), 1);
/// assert_eq!(database.links(), 1);
///
/// // Clean up.
/// drop(database);
/// fs::remove_file(&db_file).unwrap();
/// ```
#[derive(Debug)]
pub struct LinkBase {
    connection: Connection,
    version: String,
    k: usize,
    color: Option<usize>,
    trees: usize,
    links: usize,
}

/// Using the database.
impl LinkBase {
    // Key for database version.
    const KEY_VERSION: &'static str = "version";

    /// Current database version.
    pub const VERSION: &'static str = "Link-base v0.1.0";

    // Key for k-mer length.
    const KEY_K: &'static str = "k";

    // Key for the color.
    const KEY_COLOR: &'static str = "color";

    // Value for no color.
    const NO_COLOR: &'static str = ".";

    // Key for the number of stored trees.
    const KEY_TREES: &'static str = "trees";

    // Key for the number of links.
    const KEY_LINKS: &'static str = "links";

    /// Opens a connection to the database in the given file.
    ///
    /// Reads the header information and passes through any database errors.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::InvalidFormat`] if the database version is not supported or the header cannot be parsed.
    pub fn open<P: AsRef<Path>>(filename: P) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let connection = Connection::open_with_flags(filename, flags)?;

        // Get the header information.
        let mut get_tag = connection.prepare(
            "SELECT value FROM Tags WHERE key = ?1"
        )?;
        let version = get_string_value(&mut get_tag, Self::KEY_VERSION)?;
        if version != Self::VERSION {
            return Err(LinkError::InvalidFormat(format!("Unsupported database version: {} (expected {})", version, Self::VERSION)));
        }
        let k = get_numeric_value(&mut get_tag, Self::KEY_K)?;
        let color = get_string_value(&mut get_tag, Self::KEY_COLOR)?;
        let color = if color == Self::NO_COLOR {
            None
        } else {
            Some(color.parse::<usize>().map_err(|err| LinkError::InvalidFormat(format!("Invalid color {}: {}", color, err)))?)
        };
        let trees = get_numeric_value(&mut get_tag, Self::KEY_TREES)?;
        let links = get_numeric_value(&mut get_tag, Self::KEY_LINKS)?;
        drop(get_tag);

        Ok(LinkBase {
            connection,
            version,
            k, color,
            trees, links,
        })
    }

    /// Returns `true` if the database file exists.
    pub fn exists<P: AsRef<Path>>(filename: P) -> bool {
        utils::file_exists(filename)
    }

    /// Returns the filename of the database, or [`None`] if there is no filename.
    pub fn filename(&self) -> Option<&str> {
        self.connection.path()
    }

    /// Returns the size of the database file in a human-readable format.
    pub fn file_size(&self) -> Option<String> {
        let filename = self.filename()?;
        utils::file_size(filename)
    }

    /// Returns the version of the database.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the k-mer length.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Returns the color associated with the links.
    pub fn color(&self) -> Option<usize> {
        self.color
    }

    /// Returns the number of stored junction trees.
    pub fn trees(&self) -> usize {
        self.trees
    }

    /// Returns the total number of links in the stored trees.
    pub fn links(&self) -> usize {
        self.links
    }
}

//-----------------------------------------------------------------------------

/// Creating the database.
impl LinkBase {
    /// Creates a new database from a link file in the text format.
    ///
    /// # Arguments
    ///
    /// * `links_file`: Name of the link file, which may be gzip-compressed.
    /// * `db_file`: Name of the database file to be created.
    ///
    /// # Errors
    ///
    /// Returns an error if the database already exists.
    /// Passes through any errors from reading the link file and any database errors.
    pub fn create_from_file<P: AsRef<Path>, Q: AsRef<Path>>(links_file: P, db_file: Q) -> Result<()> {
        let links = LinkDatabase::load(links_file)?;
        Self::create(&links, db_file)
    }

    /// Creates a new database from the given link database.
    ///
    /// Trees without links are not stored.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::InvalidInput`] if the database already exists.
    /// Passes through any database errors.
    pub fn create<P: AsRef<Path>>(links: &LinkDatabase, filename: P) -> Result<()> {
        info!("Creating database {}", filename.as_ref().display());
        if Self::exists(&filename) {
            return Err(LinkError::InvalidInput(format!("Database {} already exists", filename.as_ref().display())));
        }

        let mut connection = Connection::open(filename)?;
        let trees = Self::insert_trees(links, &mut connection)?;
        Self::insert_tags(links, trees, &mut connection)?;
        Ok(())
    }

    fn insert_tags(links: &LinkDatabase, trees: usize, connection: &mut Connection) -> rusqlite::Result<()> {
        info!("Inserting header");

        // Create the tags table.
        connection.execute(
            "CREATE TABLE Tags (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            ) STRICT",
            (),
        )?;

        // Insert the header.
        let transaction = connection.transaction()?;
        {
            let mut insert = transaction.prepare(
                "INSERT INTO Tags(key, value) VALUES (?1, ?2)"
            )?;
            let color = links.color().map(|color| color.to_string()).unwrap_or(String::from(Self::NO_COLOR));
            insert.execute((Self::KEY_VERSION, Self::VERSION))?;
            insert.execute((Self::KEY_K, links.k().to_string()))?;
            insert.execute((Self::KEY_COLOR, color))?;
            insert.execute((Self::KEY_TREES, trees.to_string()))?;
            insert.execute((Self::KEY_LINKS, links.link_count().to_string()))?;
        }
        transaction.commit()?;

        Ok(())
    }

    // Returns the number of inserted trees.
    fn insert_trees(links: &LinkDatabase, connection: &mut Connection) -> rusqlite::Result<usize> {
        info!("Inserting junction trees");

        // Create the trees table.
        connection.execute(
            "CREATE TABLE Trees (
                tail TEXT PRIMARY KEY,
                links TEXT NOT NULL
            ) STRICT",
            (),
        )?;

        // Insert the trees.
        let mut inserted = 0;
        let transaction = connection.transaction()?;
        {
            let mut insert = transaction.prepare(
                "INSERT INTO Trees(tail, links) VALUES (?1, ?2)"
            )?;
            for tail in links.tails() {
                let tree = match links.get(tail) {
                    Ok(tree) if !tree.is_empty() => tree,
                    _ => continue,
                };
                insert.execute((tail.to_string(), LinkDatabase::encode_links(tree)))?;
                inserted += 1;
            }
        }
        transaction.commit()?;

        info!("Inserted {} junction trees", inserted);
        Ok(inserted)
    }
}

//-----------------------------------------------------------------------------

/// Random access to the junction trees in a [`LinkBase`].
///
/// The interface holds prepared statements, and it must not outlive the database connection.
///
/// # Examples
///
/// ```
/// use linked_dbg::{Kmer, LinkBase, LinkDatabase, LinkInterface};
/// use simple_sds::serialize;
/// use std::fs;
///
/// let mut links = LinkDatabase::new(5);
/// let tail: Kmer = "TTCGA".parse().unwrap();
/// links.get_or_create(tail).insert(b"TGGCG").unwrap();
/// let db_file = serialize::temp_file_name("link-base");
/// LinkBase::create(&links, &db_file).unwrap();
///
/// let database = LinkBase::open(&db_file).unwrap();
/// let mut interface = LinkInterface::new(&database).unwrap();
/// assert!(interface.contains(tail).unwrap());
/// let tree = interface.get_tree(tail).unwrap().unwrap();
/// assert_eq!(tree.link_count(), 1);
/// assert!(interface.get_tree("ACTGA".parse().unwrap()).unwrap().is_none());
///
/// // Clean up.
/// drop(interface);
/// drop(database);
/// fs::remove_file(&db_file).unwrap();
/// ```
#[derive(Debug)]
pub struct LinkInterface<'a> {
    k: usize,
    color: Option<usize>,
    get_tree: Statement<'a>,
    get_tails: Statement<'a>,
    get_all: Statement<'a>,
}

impl<'a> LinkInterface<'a> {
    /// Returns a new interface to the given database.
    ///
    /// Passes through any database errors.
    pub fn new(database: &'a LinkBase) -> Result<Self> {
        let get_tree = database.connection.prepare(
            "SELECT links FROM Trees WHERE tail = ?1"
        )?;

        let get_tails = database.connection.prepare(
            "SELECT tail FROM Trees ORDER BY tail"
        )?;

        let get_all = database.connection.prepare(
            "SELECT tail, links FROM Trees"
        )?;

        Ok(LinkInterface {
            k: database.k(),
            color: database.color(),
            get_tree, get_tails, get_all,
        })
    }

    /// Returns `true` if the database contains a tree for the tail.
    pub fn contains(&mut self, tail: Kmer) -> Result<bool> {
        let links: Option<String> = self.get_tree.query_row(
            (tail.to_string(),),
            |row| row.get(0)
        ).optional()?;
        Ok(links.is_some())
    }

    /// Returns the junction tree for the tail, or [`None`] if there is no such tree.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::InvalidFormat`] if the stored links cannot be parsed.
    /// Passes through any database errors.
    pub fn get_tree(&mut self, tail: Kmer) -> Result<Option<JunctionTree>> {
        let links: Option<String> = self.get_tree.query_row(
            (tail.to_string(),),
            |row| row.get(0)
        ).optional()?;
        match links {
            Some(links) => Ok(Some(decode_tree(&tail.to_string(), &links)?)),
            None => Ok(None),
        }
    }

    /// Returns the tails of the stored trees in sorted order.
    pub fn tails(&mut self) -> Result<Vec<Kmer>> {
        let mut result = Vec::new();
        let mut rows = self.get_tails.query(())?;
        while let Some(row) = rows.next()? {
            let tail: String = row.get(0)?;
            result.push(parse_tail(&tail)?);
        }
        Ok(result)
    }

    /// Loads all trees into a [`LinkDatabase`].
    pub fn to_link_database(&mut self) -> Result<LinkDatabase> {
        let mut result = LinkDatabase::with_color(self.k, self.color);
        let mut rows = self.get_all.query(())?;
        while let Some(row) = rows.next()? {
            let tail: String = row.get(0)?;
            let links: String = row.get(1)?;
            let tree = decode_tree(&tail, &links)?;
            result.insert(parse_tail(&tail)?, tree);
        }
        Ok(result)
    }
}

//-----------------------------------------------------------------------------

/// Type of a potential database file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DatabaseFileType {
    /// The file does not exist.
    Missing,
    /// The file is not a valid SQLite database.
    NotDatabase,
    /// The file is an unknown SQLite database.
    UnknownDatabase,
    /// The file is a known SQLite database with the given version string.
    Version(String),
}

/// Determines the type of the given file, which may be a SQLite database.
pub fn identify_database<P: AsRef<Path>>(filename: P) -> DatabaseFileType {
    let metadata = match fs::metadata(&filename) {
        Ok(metadata) => metadata,
        Err(_) => return DatabaseFileType::Missing,
    };
    if !metadata.is_file() {
        return DatabaseFileType::NotDatabase;
    }

    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let connection = match Connection::open_with_flags(filename, flags) {
        Ok(connection) => connection,
        Err(_) => return DatabaseFileType::NotDatabase,
    };

    let mut statement = match connection.prepare("SELECT value FROM Tags WHERE key = 'version'") {
        Ok(statement) => statement,
        Err(_) => return DatabaseFileType::UnknownDatabase,
    };
    let version: rusqlite::Result<String> = statement.query_row([], |row| row.get(0));
    match version {
        Ok(version) => DatabaseFileType::Version(version),
        Err(_) => DatabaseFileType::UnknownDatabase,
    }
}

fn parse_tail(tail: &str) -> Result<Kmer> {
    tail.parse::<Kmer>().map_err(|_| LinkError::InvalidFormat(format!("Invalid tail {}", tail)))
}

fn decode_tree(tail: &str, links: &str) -> Result<JunctionTree> {
    LinkDatabase::decode_links(links.split('\t')).map_err(|message| LinkError::InvalidFormat(format!("Tail {}: {}", tail, message)))
}

// Executes the statement, which is expected to return a single string value.
// Then returns the value.
fn get_string_value(statement: &mut Statement, key: &str) -> Result<String> {
    let result: rusqlite::Result<String> = statement.query_row(
        (key,),
        |row| row.get(0)
    );
    result.map_err(|err| LinkError::InvalidFormat(format!("Key not found: {} ({})", key, err)))
}

// Executes the statement, which is expected to return a single string value.
// Then returns the value as an integer.
fn get_numeric_value(statement: &mut Statement, key: &str) -> Result<usize> {
    let value = get_string_value(statement, key)?;
    value.parse::<usize>().map_err(|err| LinkError::InvalidFormat(format!("Invalid value for {}: {}", key, err)))
}

//-----------------------------------------------------------------------------
