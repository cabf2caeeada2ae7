#![allow(dead_code)]

use std::cell::RefCell;
use std::fs::File;
use std::path::PathBuf;

use bmecat::{
    Article, CancelContext, CatalogGroup, ClassificationGroup, Handlers, Header, Reader, Result,
};

/// Test fixture paths
pub struct TestFixtures {
    pub fixtures_dir: PathBuf,
}

impl TestFixtures {
    pub fn new() -> Self {
        let fixtures_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures");

        Self { fixtures_dir }
    }

    pub fn new_catalog(&self) -> PathBuf {
        self.fixtures_dir.join("new_catalog.xml")
    }

    pub fn update_products(&self) -> PathBuf {
        self.fixtures_dir.join("update_products.xml")
    }

    pub fn update_prices(&self) -> PathBuf {
        self.fixtures_dir.join("update_prices.xml")
    }

    pub fn latin1(&self) -> PathBuf {
        self.fixtures_dir.join("latin1.xml")
    }
}

/// Everything a reader run handed out, in order.
#[derive(Debug, Default)]
pub struct Collected {
    pub headers: Vec<Header>,
    pub catalog_groups: Vec<CatalogGroup>,
    pub classification_groups: Vec<ClassificationGroup>,
    pub articles: Vec<Article>,
    pub completed: bool,
}

impl Collected {
    pub fn header(&self) -> &Header {
        assert_eq!(self.headers.len(), 1, "expected exactly one header");
        &self.headers[0]
    }

    pub fn article(&self, supplier_aid: &str) -> &Article {
        self.articles
            .iter()
            .find(|a| a.supplier_aid == supplier_aid)
            .unwrap_or_else(|| panic!("no article {supplier_aid}"))
    }
}

/// Run `reader` with handlers that record every record.
pub fn collect<R: std::io::Read + std::io::Seek>(reader: &mut Reader<R>) -> Result<Collected> {
    let collected = RefCell::new(Collected::default());
    reader.run(
        &CancelContext::new(),
        Handlers::new()
            .on_header(|h| {
                collected.borrow_mut().headers.push(h);
                Ok(())
            })
            .on_catalog_group(|g| {
                collected.borrow_mut().catalog_groups.push(g);
                Ok(())
            })
            .on_classification_group(|g| {
                collected.borrow_mut().classification_groups.push(g);
                Ok(())
            })
            .on_article(|a| {
                collected.borrow_mut().articles.push(a);
                Ok(())
            })
            .on_complete(|| collected.borrow_mut().completed = true),
    )?;
    Ok(collected.into_inner())
}

pub fn read_file(path: &PathBuf) -> Result<Collected> {
    let mut reader = Reader::new(File::open(path)?);
    collect(&mut reader)
}
