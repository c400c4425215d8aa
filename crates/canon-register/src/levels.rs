use canon_record::{
    AllEPrintsLevel, AllListingsLevel, EPrintDayLevel, EPrintLevel, EPrintMonthLevel, EPrintYearLevel,
    ListingDayLevel, ListingMonthLevel, ListingYearLevel,
};

use crate::listing::RegisterListing;
use crate::node::{RegisterCollection, RegisterLevel};
use crate::version::RegisterVersion;

pub type RegisterEPrint = RegisterCollection<EPrintLevel>;
pub type RegisterEPrintDay = RegisterCollection<EPrintDayLevel>;
pub type RegisterEPrintMonth = RegisterCollection<EPrintMonthLevel>;
pub type RegisterEPrintYear = RegisterCollection<EPrintYearLevel>;
pub type RegisterEPrints = RegisterCollection<AllEPrintsLevel>;

pub type RegisterListingDay = RegisterCollection<ListingDayLevel>;
pub type RegisterListingMonth = RegisterCollection<ListingMonthLevel>;
pub type RegisterListingYear = RegisterCollection<ListingYearLevel>;
pub type RegisterListings = RegisterCollection<AllListingsLevel>;

impl RegisterLevel for EPrintLevel {
    type Child = RegisterVersion;
}

impl RegisterLevel for EPrintDayLevel {
    type Child = RegisterEPrint;
}

impl RegisterLevel for EPrintMonthLevel {
    type Child = RegisterEPrintDay;
}

impl RegisterLevel for EPrintYearLevel {
    type Child = RegisterEPrintMonth;
}

impl RegisterLevel for AllEPrintsLevel {
    type Child = RegisterEPrintYear;
}

impl RegisterLevel for ListingDayLevel {
    type Child = RegisterListing;
}

impl RegisterLevel for ListingMonthLevel {
    type Child = RegisterListingDay;
}

impl RegisterLevel for ListingYearLevel {
    type Child = RegisterListingMonth;
}

impl RegisterLevel for AllListingsLevel {
    type Child = RegisterListingYear;
}
