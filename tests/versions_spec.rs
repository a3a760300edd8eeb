use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::thread;

use genforge::versions;
use genforge::PipelineError;
use speculate2::speculate;
use tempfile::TempDir;

speculate! {
    before {
        let tmp = TempDir::new().expect("Failed to create temp dir");
        let root = tmp.path();
    }

    describe "allocate" {
        it "starts at 1" {
            let project = versions::allocate(root, "demo").expect("allocate failed");

            assert_eq!(project.generation, 1);
            assert_eq!(project.name, "demo");
            assert_eq!(project.root_path, root.join("demo").join("1"));
            assert!(project.root_path.is_dir());
        }

        it "yields 1..N without gaps when called sequentially" {
            let generations: Vec<u32> = (0..5)
                .map(|_| versions::allocate(root, "demo").unwrap().generation)
                .collect();
            assert_eq!(generations, vec![1, 2, 3, 4, 5]);
        }

        it "numbers projects independently" {
            versions::allocate(root, "a").unwrap();
            versions::allocate(root, "a").unwrap();
            assert_eq!(versions::allocate(root, "b").unwrap().generation, 1);
        }

        it "continues after the highest existing generation" {
            fs::create_dir_all(root.join("demo/7")).unwrap();
            fs::create_dir_all(root.join("demo/3")).unwrap();
            assert_eq!(versions::allocate(root, "demo").unwrap().generation, 8);
        }

        it "ignores non-numeric entries" {
            fs::create_dir_all(root.join("demo/notes")).unwrap();
            fs::create_dir_all(root.join("demo/007")).unwrap();
            fs::write(root.join("demo/latest_dir.txt"), "99").unwrap();
            fs::write(root.join("demo/5"), "a file, not a generation").unwrap();

            assert_eq!(versions::allocate(root, "demo").unwrap().generation, 1);
        }

        it "rejects unsafe project names" {
            for name in ["", "..", "a/b", "../escape"] {
                assert!(matches!(
                    versions::allocate(root, name),
                    Err(PipelineError::InvalidProjectName(_))
                ));
            }
        }

        it "never hands the same generation to two concurrent callers" {
            let root = Arc::new(root.to_path_buf());
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let root = Arc::clone(&root);
                    thread::spawn(move || loop {
                        match versions::allocate(&root, "race") {
                            Ok(project) => return project.generation,
                            Err(e) if e.is_conflict() => continue,
                            Err(e) => panic!("unexpected error: {}", e),
                        }
                    })
                })
                .collect();

            let generations: HashSet<u32> = handles
                .into_iter()
                .map(|h| h.join().expect("thread panicked"))
                .collect();
            assert_eq!(generations, (1..=8).collect::<HashSet<u32>>());
        }
    }

    describe "allocate_with_retry" {
        it "allocates like allocate when there is no contention" {
            let project = versions::allocate_with_retry(root, "demo", 3).unwrap();
            assert_eq!(project.generation, 1);
        }

        it "allocates distinct generations when callers contend" {
            let root = Arc::new(root.to_path_buf());
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let root = Arc::clone(&root);
                    thread::spawn(move || versions::allocate_with_retry(&root, "race", 16))
                })
                .collect();

            let generations: HashSet<u32> = handles
                .into_iter()
                .map(|h| h.join().expect("thread panicked").expect("allocation failed").generation)
                .collect();
            assert_eq!(generations.len(), 8);
        }
    }

    describe "list_generations" {
        it "is empty for an unknown project" {
            assert!(versions::list_generations(root, "nope").unwrap().is_empty());
        }

        it "lists generations ascending" {
            for n in ["10", "2", "1"] {
                fs::create_dir_all(root.join("demo").join(n)).unwrap();
            }
            assert_eq!(versions::list_generations(root, "demo").unwrap(), vec![1, 2, 10]);
        }
    }

    describe "latest pointer" {
        it "is absent before the first update" {
            assert_eq!(versions::read_latest(root, "demo").unwrap(), None);
        }

        it "holds the last recorded generation" {
            fs::create_dir_all(root.join("demo")).unwrap();
            versions::update_latest(root, "demo", 1).unwrap();
            let recorded = versions::update_latest(root, "demo", 2).unwrap();

            assert_eq!(recorded, 2);
            assert_eq!(fs::read_to_string(root.join("demo/latest_dir.txt")).unwrap(), "2");
            assert_eq!(versions::read_latest(root, "demo").unwrap(), Some(2));
        }

        it "never moves backwards when an older generation finishes last" {
            fs::create_dir_all(root.join("demo")).unwrap();
            versions::update_latest(root, "demo", 5).unwrap();
            let recorded = versions::update_latest(root, "demo", 3).unwrap();

            assert_eq!(recorded, 5);
            assert_eq!(versions::read_latest(root, "demo").unwrap(), Some(5));
        }

        it "ends at the highest generation under concurrent updates" {
            fs::create_dir_all(root.join("race")).unwrap();
            let root = Arc::new(root.to_path_buf());
            // Highest generations start first so older ones tend to finish last.
            let handles: Vec<_> = (1..=16u32)
                .rev()
                .map(|generation| {
                    let root = Arc::clone(&root);
                    thread::spawn(move || versions::update_latest(&root, "race", generation))
                })
                .collect();

            for handle in handles {
                handle.join().expect("thread panicked").expect("update failed");
            }
            assert_eq!(versions::read_latest(&root, "race").unwrap(), Some(16));
        }

        it "does not affect numbering" {
            fs::create_dir_all(root.join("demo")).unwrap();
            versions::update_latest(root, "demo", 41).unwrap();
            assert_eq!(versions::allocate(root, "demo").unwrap().generation, 1);
        }
    }
}
