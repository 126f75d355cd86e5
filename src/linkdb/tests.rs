use super::*;

use crate::internal;

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

//-----------------------------------------------------------------------------

fn example_database() -> LinkDatabase {
    let mut db = LinkDatabase::new(5);
    let first = db.get_or_create(internal::kmer("TTCGA"));
    first.insert(b"TGGCG").unwrap();
    first.insert(b"TCG").unwrap();
    first.insert(b"TCG").unwrap();
    let second = db.get_or_create(internal::kmer("GCGAT"));
    second.insert(b"GCG").unwrap();
    second.insert(b"CG").unwrap();
    // An empty tree.
    db.get_or_create(internal::kmer("GGTGG"));
    db
}

fn random_database(rng: &mut StdRng, k: usize, trees: usize) -> LinkDatabase {
    let mut db = LinkDatabase::new(k);
    while db.len() < trees {
        let tail: Vec<u8> = (0..k).map(|_| b"ACGT"[rng.gen_range(0..4)]).collect();
        let tree = db.get_or_create(Kmer::from_bytes(&tail).unwrap());
        let links = rng.gen_range(0..6);
        for _ in 0..links {
            let len = rng.gen_range(1..=8);
            let choices: Vec<u8> = (0..len).map(|_| b"ACGT"[rng.gen_range(0..4)]).collect();
            tree.insert(&choices).unwrap();
        }
    }
    db
}

fn save_and_load(db: &LinkDatabase, filename: &Path) -> LinkDatabase {
    let result = db.save(filename);
    assert!(result.is_ok(), "Failed to save the database to {}: {}", filename.display(), result.unwrap_err());
    let loaded = LinkDatabase::load(filename);
    assert!(loaded.is_ok(), "Failed to load the database from {}: {}", filename.display(), loaded.unwrap_err());
    loaded.unwrap()
}

fn read_string(content: &str) -> Result<LinkDatabase> {
    LinkDatabase::read(content.as_bytes())
}

//-----------------------------------------------------------------------------

#[test]
fn empty_database() {
    let db = LinkDatabase::new(5);
    assert!(db.is_empty(), "New database is not empty");
    assert_eq!(db.len(), 0, "New database has trees");
    assert_eq!(db.link_count(), 0, "New database has links");
    assert_eq!(db.color(), None, "New database has a color");
    let result = db.get(internal::kmer("ACGTA"));
    assert!(matches!(result, Err(LinkError::NotFound(_))), "Expected NotFound for a missing tail");
}

#[test]
fn access_and_iteration() {
    let mut db = example_database();
    assert_eq!(db.len(), 3, "Wrong number of trees");
    assert_eq!(db.link_count(), 4, "Wrong number of links");
    assert!(db.contains(internal::kmer("GGTGG")), "Missing the empty tree");
    assert!(db.get(internal::kmer("GGTGG")).unwrap().is_empty(), "The empty tree has links");
    assert_eq!(internal::link_strings(&db, "GCGAT"), vec!["CG", "GCG"], "Wrong links for GCGAT");

    let tails: Vec<String> = db.tails().iter().map(|tail| tail.to_string()).collect();
    assert_eq!(tails, vec!["GCGAT", "GGTGG", "TTCGA"], "Wrong tails");
    let mut iterated: Vec<String> = db.iter().map(|(tail, _)| tail.to_string()).collect();
    iterated.sort();
    assert_eq!(iterated, tails, "Iteration does not match the tails");

    let tree = db.get_mut(internal::kmer("GGTGG"));
    assert!(tree.is_ok(), "Failed to get a mutable tree: {}", tree.unwrap_err());
    tree.unwrap().insert(b"C").unwrap();
    assert_eq!(db.link_count(), 5, "Mutation through get_mut() was lost");

    db.set_color(Some(2));
    assert_eq!(db.color(), Some(2), "Wrong color after setting it");
}

#[test]
fn text_format() {
    let mut db = example_database();
    db.set_color(Some(1));
    let mut buffer: Vec<u8> = Vec::new();
    let result = db.write(&mut buffer);
    assert!(result.is_ok(), "Failed to write the database: {}", result.unwrap_err());

    let truth = "#linkdb\tv1\n#k\t5\n#color\t1\nGCGAT\tCG:1,1\tGCG:1,1,1\nTTCGA\tTCG:3,2,2\tTGGCG:3,1,1,1,1\n";
    assert_eq!(String::from_utf8_lossy(&buffer), truth, "Wrong text representation");

    let loaded = read_string(truth);
    assert!(loaded.is_ok(), "Failed to read the database: {}", loaded.unwrap_err());
    let loaded = loaded.unwrap();
    assert_eq!(loaded.k(), 5, "Wrong k after reading");
    assert_eq!(loaded.color(), Some(1), "Wrong color after reading");
    assert_eq!(loaded.link_set(), db.link_set(), "Wrong links after reading");
    assert!(!loaded.contains(internal::kmer("GGTGG")), "An empty tree was stored");
}

#[test]
fn save_and_load_files() {
    let db = example_database();
    for extension in [None, Some("gz")] {
        let mut filename = internal::temp_file("linked-dbg");
        if let Some(extension) = extension {
            filename.set_extension(extension);
        }
        let loaded = save_and_load(&db, &filename);
        assert_eq!(utils::is_gzipped(&filename), extension.is_some(), "Wrong compression for extension {:?}", extension);
        assert_eq!(loaded.link_set(), db.link_set(), "Wrong links after loading with extension {:?}", extension);
        assert_eq!(loaded.color(), None, "Wrong color after loading with extension {:?}", extension);
        internal::remove_file(&filename);
    }
    assert!(matches!(LinkDatabase::load("this-file-does-not-exist"), Err(LinkError::Io(_))), "Expected an I/O error for a missing file");
}

#[test]
fn random_round_trips() {
    let mut rng = StdRng::seed_from_u64(0xdb);
    for k in [5, 11, 31] {
        let mut db = random_database(&mut rng, k, 50);
        db.set_color(if k == 11 { Some(k) } else { None });
        let filename = internal::temp_file("linked-dbg");
        let loaded = save_and_load(&db, &filename);
        assert_eq!(loaded.k(), k, "Wrong k after a round trip");
        assert_eq!(loaded.color(), db.color(), "Wrong color after a round trip with k = {}", k);
        assert_eq!(loaded.link_set(), db.link_set(), "Wrong links after a round trip with k = {}", k);
        assert_eq!(loaded.link_count(), db.link_count(), "Wrong number of links after a round trip with k = {}", k);
        internal::remove_file(&filename);
    }
}

#[test]
fn invalid_input() {
    let cases = [
        ("#linkdb\tv2\n#k\t5\n", "Line 1"),
        ("#linkdb\tv1\n#k\tfive\n", "Line 2"),
        ("#linkdb\tv1\n#k\t5\n#color\tred\n", "Line 3"),
        ("TTCGA\tTCG:1,1,1\n", "Line 1"),
        ("#linkdb\tv1\nTTCGA\tTCG:1,1,1\n", "Line 2"),
        ("#linkdb\tv1\n#k\t5\nTTCG\tTCG:1,1,1\n", "Line 3"),
        ("#linkdb\tv1\n#k\t5\nTTCGA\tTCG:1,1\n", "Line 3"),
        ("#linkdb\tv1\n#k\t5\nTTCGA\tTCG1,1,1\n", "Line 3"),
        ("#linkdb\tv1\n#k\t5\nTTCGA\tTNG:1,1,1\n", "Line 3"),
        ("#linkdb\tv1\n#k\t5\nTTCGA\tTCG:1,x,1\n", "Line 3"),
        ("#linkdb\tv1\n#k\t5\n\nTTCGA\tTCG:1,1,1\nTTCGA\tA:1\n", "Line 5"),
    ];
    for (content, line) in cases.iter() {
        let result = read_string(content);
        match result {
            Err(LinkError::InvalidFormat(message)) => {
                assert!(message.starts_with(line), "Wrong line in error \"{}\" for input {:?}", message, content);
            },
            Err(err) => panic!("Wrong error type {} for input {:?}", err, content),
            Ok(_) => panic!("Read invalid input {:?}", content),
        }
    }
    assert!(read_string("").is_err(), "Read an empty file");
}

#[test]
fn prune_database() {
    let mut db = example_database();
    let removed = db.prune(2);
    assert_eq!(removed, 9, "Wrong number of removed nodes");
    assert_eq!(db.len(), 3, "Pruning removed trees");
    assert_eq!(internal::link_strings(&db, "TTCGA"), vec!["TCG"], "Wrong links for TTCGA after pruning");
    assert!(db.get(internal::kmer("GCGAT")).unwrap().is_empty(), "Links with coverage 1 survived");
    for (_, tree) in db.iter() {
        for link in tree.get_all_links(None) {
            assert!(link.coverage.iter().all(|count| *count >= 2), "Link {} survived pruning", link);
        }
    }
}

//-----------------------------------------------------------------------------
