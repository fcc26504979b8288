use std::fs::File;
use std::io::Read;

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::catalog::{Grouping, Item, Purchase};

pub fn read_purchases(path: &str) -> Result<Vec<Purchase>, csv::Error> {
    read_csv_file(path, "purchases")
}

pub fn read_items(path: &str) -> Result<Vec<Item>, csv::Error> {
    read_csv_file(path, "listings")
}

pub fn read_groupings(path: &str) -> Result<Vec<Grouping>, csv::Error> {
    read_csv_file(path, "restaurants")
}

fn read_csv_file<T: DeserializeOwned>(path: &str, descriptive_name: &str) -> Result<Vec<T>, csv::Error> {
    let file = File::open(path)?;
    let records = read_csv(file, descriptive_name)?;
    info!(path, qty_records = records.len(), "loaded {}", descriptive_name);
    Ok(records)
}

/// Deserializes comma separated rows with a header line. Rows that do not
/// parse are skipped and counted; only an unreadable header fails the read.
pub fn read_csv<R, T>(input: R, descriptive_name: &str) -> Result<Vec<T>, csv::Error>
where
    R: Read,
    T: DeserializeOwned,
{
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(input);
    reader.headers()?;

    let mut records = Vec::new();
    let mut qty_skipped = 0_usize;
    for result in reader.deserialize() {
        match result {
            Ok(record) => records.push(record),
            Err(error) => {
                qty_skipped += 1;
                warn!(%error, "unable to parse {} row", descriptive_name);
            }
        }
    }

    if qty_skipped > 0 {
        warn!(qty_skipped, "skipped unparseable {} rows", descriptive_name);
    }
    Ok(records)
}

#[cfg(test)]
mod io_test {
    use super::*;
    use crate::catalog::PurchaseStatus;

    #[test]
    fn should_read_purchases_and_skip_broken_rows() {
        let input = "user_id,listing_id,quantity,status,purchased_at\n\
                     1,10,2,COMPLETED,1700000000\n\
                     1,11,x,COMPLETED,1700000000\n\
                     2,10,1,PENDING,\n\
                     3,12,1,SHIPPED,1700000100\n";

        let purchases: Vec<Purchase> = read_csv(input.as_bytes(), "purchases").unwrap();

        assert_eq!(2, purchases.len());
        assert_eq!(PurchaseStatus::Completed, purchases[0].status);
        assert_eq!(Some(1_700_000_000), purchases[0].purchased_at);
        assert_eq!(PurchaseStatus::Pending, purchases[1].status);
        assert_eq!(None, purchases[1].purchased_at);
    }

    #[test]
    fn should_read_listings_and_restaurants() {
        let listings = "id,restaurant_id,title,pick_up_price,delivery_price\n\
                        10, 1 ,Margherita,8.5,\n";
        let restaurants = "id,restaurant_name,category,latitude,longitude\n\
                           1,Napoli,pizza,41.01,28.97\n\
                           2,Sakura,sushi,,\n";

        let items: Vec<Item> = read_csv(listings.as_bytes(), "listings").unwrap();
        let groupings: Vec<Grouping> = read_csv(restaurants.as_bytes(), "restaurants").unwrap();

        assert_eq!(1, items.len());
        assert_eq!(1, items[0].grouping_id);
        assert_eq!("Margherita", items[0].title);
        assert_eq!(Some(8.5), items[0].pick_up_price);
        assert_eq!(None, items[0].delivery_price);

        assert_eq!(2, groupings.len());
        assert_eq!("Napoli", groupings[0].name);
        assert_eq!(Some(41.01), groupings[0].latitude);
        assert_eq!(None, groupings[1].longitude);
    }

    #[test]
    fn should_fail_for_missing_file() {
        assert!(read_purchases("/nonexistent/purchases.csv").is_err());
    }
}
