pub mod booking;
pub mod movie;
pub mod seat;
pub mod showtime;
pub mod theater;

pub use booking::{Booking, BookingConfirmation, BookingDetail};
pub use movie::{Movie, MovieDetail};
pub use seat::{Seat, SeatId, SeatMap, SeatMapEntry};
pub use showtime::{Showtime, ShowtimeInfo, ShowtimeListing};
pub use theater::Theater;
