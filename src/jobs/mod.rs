pub mod ride_status_checker;
